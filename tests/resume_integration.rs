//! Integration tests for the subscription and resumption kernel.
//!
//! Exercises source chaining, cancellation between sources, the future bridge
//! and stack-safe repetition through the public API only.

use std::{
  cell::{Cell, RefCell},
  rc::Rc,
};

use futures::{channel::oneshot, executor::LocalPool, future};
use rxresume::prelude::*;

/// Observer that records every notification and can be told to close.
#[derive(Clone, Default)]
struct Recorder {
  values: Rc<RefCell<Vec<i32>>>,
  errors: Rc<RefCell<Vec<String>>>,
  completions: Rc<Cell<usize>>,
  close_after: Option<usize>,
}

impl Recorder {
  fn closing_after(n: usize) -> Self { Recorder { close_after: Some(n), ..Default::default() } }

  fn terminals(&self) -> usize { self.errors.borrow().len() + self.completions.get() }
}

impl Observer<i32> for Recorder {
  fn next(&mut self, value: i32) { self.values.borrow_mut().push(value); }

  fn error(self, err: Error) { self.errors.borrow_mut().push(err.to_string()); }

  fn complete(self) { self.completions.set(self.completions.get() + 1); }

  fn is_closed(&self) -> bool {
    self
      .close_after
      .is_some_and(|n| self.values.borrow().len() >= n)
  }
}

fn manual() -> (ManualScheduler, Option<SchedulerRef>) {
  let scheduler = ManualScheduler::new();
  let handle: SchedulerRef = Rc::new(scheduler.clone());
  (scheduler, Some(handle))
}

#[test]
fn test_resumption_fallthrough() {
  let (scheduler, handle) = manual();
  let seen_by_c = Rc::new(RefCell::new(vec![]));
  let c_seen = seen_by_c.clone();
  let source = observable::on_error_resume_next([
    Source::from(observable::throw(Error::msg("e1"), None)),
    Source::from(observable::return_value(2, None)),
    Source::factory(move |err: Option<Error>| {
      c_seen.borrow_mut().push(err.map(|e| e.to_string()));
      observable::return_value(3, None)
    }),
  ]);
  let recorder = Recorder::default();
  source.subscribe_with_scheduler(recorder.clone(), handle);

  // advance to A, A fails, advance to B
  for _ in 0..3 {
    assert!(scheduler.run_next());
    assert_eq!(recorder.terminals(), 0);
  }
  assert!(seen_by_c.borrow().is_empty());
  // B emits and completes, C is advanced to right away
  assert!(scheduler.run_next());
  assert_eq!(*recorder.values.borrow(), vec![2]);
  assert!(scheduler.run_next());
  assert_eq!(*seen_by_c.borrow(), vec![None]);

  scheduler.flush();
  assert_eq!(*recorder.values.borrow(), vec![2, 3]);
  assert_eq!(recorder.completions.get(), 1);
  assert!(recorder.errors.borrow().is_empty());
}

#[test]
fn test_exhaustion_completes() {
  let recorder = Recorder::default();
  observable::on_error_resume_next(Vec::<Source<i32>>::new()).subscribe(recorder.clone());
  assert!(recorder.values.borrow().is_empty());
  assert!(recorder.errors.borrow().is_empty());
  assert_eq!(recorder.completions.get(), 1);
}

#[test]
fn test_cancellation_between_sources() {
  let (scheduler, handle) = manual();
  let b_subscribed = Rc::new(Cell::new(false));
  let c_subscribed = b_subscribed.clone();
  let b = Observable::new(move |observer: BoxedObserver<i32>, _| {
    c_subscribed.set(true);
    observer.complete();
    Disposable::empty()
  });
  let recorder = Recorder::default();
  let subscription = observable::on_error_resume_next([observable::throw(Error::msg("e1"), None), b])
    .subscribe_with_scheduler(recorder.clone(), handle);

  // subscribe A, then A fails and schedules the advance to B
  assert!(scheduler.run_next());
  assert!(scheduler.run_next());
  assert_eq!(scheduler.pending_count(), 1);

  subscription.dispose();
  assert_eq!(scheduler.pending_count(), 0);
  assert_eq!(scheduler.flush(), 0);
  assert!(!b_subscribed.get());
  assert_eq!(recorder.terminals(), 0);
}

#[test]
fn test_terminal_once_across_chain() {
  let recorder = Recorder::default();
  let source = observable::on_error_resume_next([
    Source::from(observable::throw(Error::msg("a"), None)),
    Source::try_factory(|_| Err(Error::msg("b"))),
    Source::from(observable::repeat_value(1, Some(2))),
    Source::factory(|_| observable::throw(Error::msg("d"), None)),
    Source::try_factory(|_| Err(Error::msg("last factory"))),
  ]);
  source.subscribe(recorder.clone());
  assert_eq!(*recorder.values.borrow(), vec![1, 1]);
  assert_eq!(recorder.terminals(), 1);
  assert_eq!(*recorder.errors.borrow(), vec!["last factory"]);
}

#[test]
fn test_consumer_panic_is_not_a_source_failure() {
  let b_subscribed = Rc::new(Cell::new(false));
  let c_subscribed = b_subscribed.clone();
  let a = Observable::new(|mut observer: BoxedObserver<i32>, _| {
    observer.next(1);
    observer.complete();
    Disposable::empty()
  });
  let chain = observable::on_error_resume_next([
    Source::from(a),
    Source::factory(move |_| {
      c_subscribed.set(true);
      observable::return_value(2, None)
    }),
  ]);
  let values = Rc::new(RefCell::new(vec![]));
  let c_values = values.clone();
  let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
    chain.subscribe_fn(
      move |v| {
        c_values.borrow_mut().push(v);
        if v == 1 {
          panic!("consumer rejected {v}");
        }
      },
      |_| {},
      || {},
    )
  }));
  assert!(res.is_err());
  assert_eq!(*values.borrow(), vec![1]);
  assert!(!b_subscribed.get());
  assert!(!CurrentThreadScheduler::is_draining());
}

#[test]
fn test_future_sources_in_chain() {
  let mut pool = LocalPool::new();
  let (tx, rx) = oneshot::channel();
  let recorder = Recorder::default();
  observable::on_error_resume_next([
    Source::future(future::ready(Err::<i32, _>(Error::msg("offline"))), pool.spawner()),
    Source::future(rx, pool.spawner()),
    Source::from(observable::return_value(9, None)),
  ])
  .subscribe(recorder.clone());

  pool.run_until_stalled();
  assert!(recorder.values.borrow().is_empty());
  tx.send(4).unwrap();
  pool.run_until_stalled();
  assert_eq!(*recorder.values.borrow(), vec![4, 9]);
  assert_eq!(recorder.completions.get(), 1);
}

#[test]
fn test_dispose_cancels_in_flight_future() {
  let mut pool = LocalPool::new();
  let (tx, rx) = oneshot::channel();
  let after = Rc::new(Cell::new(false));
  let c_after = after.clone();
  let recorder = Recorder::default();
  let chain = observable::on_error_resume_next([
    Source::future(rx, pool.spawner()),
    Source::factory(move |_| {
      c_after.set(true);
      observable::empty(None)
    }),
  ]);
  let subscription = chain.subscribe(recorder.clone());
  pool.run_until_stalled();
  assert!(!tx.is_canceled());

  subscription.dispose();
  pool.run_until_stalled();
  // the chain is still alive, the future is not
  assert!(tx.is_canceled());
  assert!(tx.send(1).is_err());
  pool.run_until_stalled();
  assert!(recorder.values.borrow().is_empty());
  assert_eq!(recorder.terminals(), 0);
  assert!(!after.get());
  drop(chain);
}

#[test]
fn test_cancelled_future_falls_through() {
  let mut pool = LocalPool::new();
  let (tx, rx) = oneshot::channel::<i32>();
  let carried = Rc::new(RefCell::new(None));
  let c_carried = carried.clone();
  let recorder = Recorder::default();
  observable::on_error_resume_next([
    Source::future(rx, pool.spawner()),
    Source::factory(move |err| {
      *c_carried.borrow_mut() = err;
      observable::return_value(0, None)
    }),
  ])
  .subscribe(recorder.clone());
  drop(tx);
  pool.run_until_stalled();
  assert!(carried.borrow().as_ref().is_some_and(Error::is_cancelled));
  assert_eq!(*recorder.values.borrow(), vec![0]);
}

#[test]
fn test_unbounded_repeat_is_stack_safe() {
  const ROUNDS: usize = 100_000;
  let recorder = Recorder::closing_after(ROUNDS);
  let subscription = observable::repeat_value(42, None).subscribe(recorder.clone());
  assert_eq!(recorder.values.borrow().len(), ROUNDS);
  assert!(recorder.values.borrow().iter().all(|v| *v == 42));
  assert_eq!(recorder.terminals(), 0);
  subscription.dispose();
}

#[test]
fn test_unbounded_repeat_stops_on_dispose() {
  let (scheduler, handle) = manual();
  let recorder = Recorder::default();
  let subscription = observable::repeat_value(1, None).subscribe_with_scheduler(recorder.clone(), handle);
  for _ in 0..2_000 {
    assert!(scheduler.run_next());
  }
  subscription.dispose();
  assert_eq!(scheduler.flush(), 0);
  assert_eq!(recorder.values.borrow().len(), 1_000);
}

#[test]
fn test_ten_thousand_sources_are_stack_safe() {
  const SOURCES: usize = 10_000;
  let depth = Rc::new(Cell::new((usize::MAX, 0usize)));
  let c_depth = depth.clone();
  let check_depth = move |_: i32| {
    let marker = 0u8;
    let addr = &marker as *const u8 as usize;
    let (low, high) = c_depth.get();
    c_depth.set((low.min(addr), high.max(addr)));
  };
  let count = Rc::new(Cell::new(0));
  let done = Rc::new(Cell::new(false));
  let (c_count, c_done) = (count.clone(), done.clone());
  let sources = (0..SOURCES).map(|i| observable::return_value(i as i32, None));
  observable::on_error_resume_next(sources).subscribe_fn(
    move |v| {
      check_depth(v);
      c_count.set(c_count.get() + 1);
    },
    |_| {},
    move || c_done.set(true),
  );

  assert_eq!(count.get(), SOURCES);
  assert!(done.get());
  let (low, high) = depth.get();
  assert!(high - low < 64 * 1024, "stack grew by {} bytes", high - low);
}

#[test]
fn test_dispose_guard_stops_chain() {
  let (scheduler, handle) = manual();
  let recorder = Recorder::default();
  {
    let _guard = observable::on_error_resume_next([observable::return_value(1, None)])
      .subscribe_with_scheduler(recorder.clone(), handle)
      .dispose_when_dropped();
  }
  assert_eq!(scheduler.flush(), 0);
  assert_eq!(recorder.terminals(), 0);
}

#[cfg(feature = "tokio-scheduler")]
#[tokio::test]
async fn test_tokio_local_spawner() {
  let local = tokio::task::LocalSet::new();
  local
    .run_until(async {
      let (tx, rx) = oneshot::channel();
      let (done_tx, done_rx) = oneshot::channel();
      let values = Rc::new(RefCell::new(vec![]));
      let c_values = values.clone();
      observable::from_future(rx, TokioLocalSpawner).subscribe_fn(
        move |v| c_values.borrow_mut().push(v),
        |_| {},
        move || {
          let _ = done_tx.send(());
        },
      );
      tx.send(11).unwrap();
      done_rx.await.unwrap();
      assert_eq!(*values.borrow(), vec![11]);
    })
    .await;
}
