use std::{cell::RefCell, collections::VecDeque, rc::Rc};

use tracing::trace;

use super::{Action, ScheduledAction, Scheduler};
use crate::disposable::Disposable;

/// A scheduler that only queues; actions run when the caller says so.
///
/// Useful to stop a pipeline exactly at a hand-off point, e.g. between two
/// sources of the resumption engine. Actions scheduled while running are
/// appended to the same queue, so draining is iterative.
#[derive(Clone, Default)]
pub struct ManualScheduler {
  queue: Rc<RefCell<VecDeque<ScheduledAction>>>,
}

impl ManualScheduler {
  pub fn new() -> Self { Self::default() }

  /// Number of queued actions that have not been cancelled.
  pub fn pending_count(&self) -> usize {
    self
      .queue
      .borrow()
      .iter()
      .filter(|a| !a.is_cancelled())
      .count()
  }

  /// Runs the next non-cancelled action. Returns false if there was none.
  pub fn run_next(&self) -> bool {
    loop {
      let next = self.queue.borrow_mut().pop_front();
      match next {
        Some(action) => {
          if action.run(self) {
            return true;
          }
        }
        None => return false,
      }
    }
  }

  /// Runs actions until the queue is empty. Returns how many ran.
  pub fn flush(&self) -> usize {
    let mut executed = 0;
    while self.run_next() {
      executed += 1;
    }
    trace!(executed, "manual scheduler flushed");
    executed
  }
}

impl Scheduler for ManualScheduler {
  fn schedule(&self, action: Action) -> Disposable {
    let (scheduled, handle) = ScheduledAction::new(action);
    self.queue.borrow_mut().push_back(scheduled);
    handle
  }
}
