use std::{cell::Cell, rc::Rc};

use tracing::debug;

use crate::{
  disposable::{CompositeDisposable, SerialDisposable, SingleAssignmentDisposable},
  error::Error,
  observable::{resolve_scheduler, Observable},
  observer::{BoxedObserver, Observer, SharedObserver},
  scheduler::{SchedulerExt, SchedulerRef},
};

impl<T: 'static> Observable<T> {
  /// Resubscribes to this observable each time it completes.
  ///
  /// `Some(n)` subscribes `n` times and then completes, `Some(0)` completes
  /// without subscribing at all. `None` repeats until the subscription is
  /// disposed or the observer reports `is_closed`. An error ends the
  /// repetition.
  ///
  /// Every round is a fresh scheduled continuation, so unbounded repetition
  /// never grows the stack. It does run inside `subscribe` on the
  /// current-thread trampoline: with `None` and an observer that never
  /// reports `is_closed`, `subscribe` does not return. Subscribe with a
  /// queueing scheduler such as
  /// [`ManualScheduler`](crate::scheduler::ManualScheduler) to keep control.
  pub fn repeat(&self, count: Option<usize>) -> Observable<T> {
    let source = self.clone();
    Observable::new(move |observer, scheduler| {
      let repeat = Rc::new(Repeat {
        source: source.clone(),
        remaining: Cell::new(count),
        round: Cell::new(0),
        observer: SharedObserver::new(observer),
        scheduler: resolve_scheduler(&None, scheduler),
        current: SerialDisposable::new(),
        pending: SerialDisposable::new(),
      });
      let disposable = CompositeDisposable::new([repeat.current.clone().into(), repeat.pending.clone().into()]);
      repeat.schedule_round();
      disposable.into()
    })
  }
}

struct Repeat<T> {
  source: Observable<T>,
  remaining: Cell<Option<usize>>,
  round: Cell<usize>,
  observer: SharedObserver<BoxedObserver<T>>,
  scheduler: SchedulerRef,
  current: SerialDisposable,
  pending: SerialDisposable,
}

impl<T: 'static> Repeat<T> {
  fn schedule_round(self: &Rc<Self>) {
    let round = self.round.get();
    let repeat = self.clone();
    let handle = self.scheduler.schedule_fn(move |_| repeat.subscribe_round());
    if self.round.get() == round {
      self.pending.set(handle);
    }
  }

  fn subscribe_round(self: &Rc<Self>) {
    if self.observer.is_closed() {
      debug!(rounds = self.round.get(), "observer closed, repeat stopped");
      return;
    }
    match self.remaining.get() {
      Some(0) => {
        debug!(rounds = self.round.get(), "repeat finished");
        self.observer.clone().complete();
        return;
      }
      Some(n) => self.remaining.set(Some(n - 1)),
      None => {}
    }
    self.round.set(self.round.get() + 1);

    let slot = SingleAssignmentDisposable::new();
    self.current.set(slot.clone().into());
    let observer = RepeatObserver {
      outer: self.observer.clone(),
      repeat: self.clone(),
    };
    let subscription = self
      .source
      .subscribe_with_scheduler(observer, Some(self.scheduler.clone()));
    if let Err(err) = slot.set(subscription) {
      self.observer.clone().error(err.into());
    }
  }
}

struct RepeatObserver<T> {
  outer: SharedObserver<BoxedObserver<T>>,
  repeat: Rc<Repeat<T>>,
}

impl<T: 'static> Observer<T> for RepeatObserver<T> {
  #[inline]
  fn next(&mut self, value: T) { self.outer.next(value) }

  fn error(self, err: Error) { self.outer.error(err) }

  fn complete(self) { self.repeat.schedule_round() }

  #[inline]
  fn is_closed(&self) -> bool { self.outer.is_closed() }
}

#[cfg(test)]
mod tests {
  use std::cell::RefCell;

  use super::*;
  use crate::{
    disposable::{Disposable, DisposableLike},
    observable::{return_value, repeat_value, throw},
    observer::FnObserver,
    scheduler::ManualScheduler,
  };

  fn collect(source: &Observable<i32>) -> (Rc<RefCell<Vec<i32>>>, Rc<Cell<bool>>) {
    let values = Rc::new(RefCell::new(vec![]));
    let done = Rc::new(Cell::new(false));
    let (c_values, c_done) = (values.clone(), done.clone());
    source.subscribe_fn(move |v| c_values.borrow_mut().push(v), |_| {}, move || c_done.set(true));
    (values, done)
  }

  #[test]
  fn repeats_count_times() {
    let (values, done) = collect(&repeat_value(42, Some(3)));
    assert_eq!(*values.borrow(), vec![42, 42, 42]);
    assert!(done.get());
  }

  #[test]
  fn zero_count_only_completes() {
    let (values, done) = collect(&repeat_value(42, Some(0)));
    assert!(values.borrow().is_empty());
    assert!(done.get());
  }

  #[test]
  fn resubscribes_the_source() {
    let subscriptions = Rc::new(Cell::new(0));
    let c_subscriptions = subscriptions.clone();
    let source = Observable::new(move |mut observer: BoxedObserver<i32>, _| {
      c_subscriptions.set(c_subscriptions.get() + 1);
      observer.next(c_subscriptions.get());
      observer.complete();
      Disposable::empty()
    });
    let (values, _) = collect(&source.repeat(Some(2)));
    assert_eq!(*values.borrow(), vec![1, 2]);
    assert_eq!(subscriptions.get(), 2);
  }

  #[test]
  fn error_ends_repetition() {
    let err = Rc::new(RefCell::new(None));
    let c_err = err.clone();
    throw::<i32>(Error::msg("stop"), None)
      .repeat(None)
      .subscribe_fn(|_| {}, move |e| *c_err.borrow_mut() = Some(e.to_string()), || {});
    assert_eq!(err.borrow().as_deref(), Some("stop"));
  }

  #[test]
  fn dispose_stops_pending_round() {
    let manual = ManualScheduler::new();
    let values = Rc::new(RefCell::new(vec![]));
    let c_values = values.clone();
    let subscription = return_value(1, None).repeat(None).subscribe_with_scheduler(
      FnObserver::new(move |v: i32| c_values.borrow_mut().push(v), |_| {}, || {}),
      Some(Rc::new(manual.clone())),
    );
    for _ in 0..6 {
      manual.run_next();
    }
    subscription.dispose();
    assert_eq!(manual.flush(), 0);
    assert_eq!(*values.borrow(), vec![1, 1, 1]);
  }
}
