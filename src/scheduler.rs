//! The scheduler contract.
//!
//! A [`Scheduler`] runs actions one at a time and must trampoline: an action
//! scheduled from inside another action runs after the current one has
//! returned, never as a nested call. This is what keeps recursive
//! continuation scheduling (resubscribing, advancing to the next source) at a
//! constant stack depth.

use std::rc::Rc;

use crate::disposable::{Disposable, DisposableLike};

mod current_thread;
mod manual;

pub use current_thread::CurrentThreadScheduler;
pub use manual::ManualScheduler;

/// A unit of work. It receives the scheduler running it so it can schedule
/// its own continuation.
pub type Action = Box<dyn FnOnce(&dyn Scheduler)>;

/// A shared scheduler handle, the form schedulers are passed around in.
pub type SchedulerRef = Rc<dyn Scheduler>;

/// A Scheduler is an object to order actions and schedule their execution.
pub trait Scheduler {
  /// Queues `action`.
  ///
  /// Disposing the returned handle before the action starts prevents it from
  /// running. It has no effect once the action is executing.
  fn schedule(&self, action: Action) -> Disposable;
}

/// Ergonomic helpers over [`Scheduler::schedule`].
pub trait SchedulerExt: Scheduler {
  /// Schedules a closure without boxing at the call site.
  fn schedule_fn<F>(&self, action: F) -> Disposable
  where
    F: FnOnce(&dyn Scheduler) + 'static,
  {
    self.schedule(Box::new(action))
  }

  /// Schedules an action together with the state it should receive.
  fn schedule_with_state<S, F>(&self, state: S, action: F) -> Disposable
  where
    S: 'static,
    F: FnOnce(&dyn Scheduler, S) + 'static,
  {
    self.schedule(Box::new(move |scheduler: &dyn Scheduler| action(scheduler, state)))
  }
}

impl<T: Scheduler + ?Sized> SchedulerExt for T {}

/// An action waiting in a scheduler queue with its cancellation handle.
pub(crate) struct ScheduledAction {
  action: Action,
  handle: Disposable,
}

impl ScheduledAction {
  pub(crate) fn new(action: Action) -> (Self, Disposable) {
    let handle = Disposable::empty();
    (ScheduledAction { action, handle: handle.clone() }, handle)
  }

  #[inline]
  pub(crate) fn is_cancelled(&self) -> bool { self.handle.is_disposed() }

  /// Runs the action unless it was cancelled. Returns whether it ran.
  pub(crate) fn run(self, scheduler: &dyn Scheduler) -> bool {
    if self.is_cancelled() {
      return false;
    }
    (self.action)(scheduler);
    true
  }
}
