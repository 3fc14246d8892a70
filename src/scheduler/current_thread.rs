use std::{cell::RefCell, collections::VecDeque, rc::Rc};

use tracing::trace;

use super::{Action, ScheduledAction, Scheduler, SchedulerRef};
use crate::disposable::Disposable;

// ==================== Internal State ====================

#[derive(Default)]
struct Trampoline {
  queue: VecDeque<ScheduledAction>,
  running: bool,
}

thread_local! {
  static TRAMPOLINE: RefCell<Trampoline> = RefCell::new(Trampoline::default());
  static SINGLETON: SchedulerRef = Rc::new(CurrentThreadScheduler);
}

/// Puts the trampoline back to idle when draining ends, including when an
/// action panics. Pending actions are dropped in that case.
struct DrainGuard;

impl Drop for DrainGuard {
  fn drop(&mut self) {
    let abandoned = TRAMPOLINE.with(|t| {
      let mut t = t.borrow_mut();
      t.running = false;
      std::mem::take(&mut t.queue)
    });
    if !abandoned.is_empty() {
      trace!(dropped = abandoned.len(), "trampoline unwound with pending actions");
    }
  }
}

// ==================== CurrentThreadScheduler ====================

/// The default scheduler: a per-thread trampoline.
///
/// The first `schedule` call on an idle thread runs the action and then drains
/// everything it scheduled, in FIFO order, before returning. Calls made while
/// an action runs only enqueue.
///
/// This is a zero-sized type that accesses thread-local state.
/// All instances in the same thread share the same queue.
#[derive(Clone, Copy, Debug, Default)]
pub struct CurrentThreadScheduler;

impl CurrentThreadScheduler {
  /// The shared handle for this thread.
  pub fn singleton() -> SchedulerRef { SINGLETON.with(Rc::clone) }

  /// Whether the trampoline of this thread is currently draining.
  pub fn is_draining() -> bool { TRAMPOLINE.with(|t| t.borrow().running) }

  /// Number of actions waiting behind the running one.
  pub fn pending_count() -> usize { TRAMPOLINE.with(|t| t.borrow().queue.len()) }

  fn drain() {
    let _guard = DrainGuard;
    let mut executed = 0usize;
    while let Some(next) = TRAMPOLINE.with(|t| t.borrow_mut().queue.pop_front()) {
      if next.run(&CurrentThreadScheduler) {
        executed += 1;
      }
    }
    trace!(executed, "trampoline drained");
  }
}

impl Scheduler for CurrentThreadScheduler {
  fn schedule(&self, action: Action) -> Disposable {
    let (scheduled, handle) = ScheduledAction::new(action);
    let idle = TRAMPOLINE.with(|t| {
      let mut t = t.borrow_mut();
      t.queue.push_back(scheduled);
      !std::mem::replace(&mut t.running, true)
    });
    if idle {
      Self::drain();
    }
    handle
  }
}
