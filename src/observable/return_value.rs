use std::rc::Rc;

use super::{resolve_scheduler, Observable};
use crate::{
  error::{self, Error},
  observer::Observer,
  scheduler::{SchedulerExt, SchedulerRef},
};

/// Creates an observable producing a single value.
///
/// Each subscription schedules one action that emits `value` and completes.
/// The action runs on `scheduler` if given, else on the scheduler passed to
/// `subscribe_with_scheduler`, else on the current-thread trampoline.
///
/// # Examples
///
/// ```
/// use rxresume::prelude::*;
///
/// observable::return_value(123, None).subscribe_fn(|v| println!("{v}"), |_| {}, || {});
/// ```
pub fn return_value<T>(value: T, scheduler: Option<SchedulerRef>) -> Observable<T>
where
  T: Clone + 'static,
{
  Observable::new(move |mut observer, given| {
    let value = value.clone();
    resolve_scheduler(&scheduler, given).schedule_fn(move |_| {
      observer.next(value);
      observer.complete();
    })
  })
}

/// Creates an observable that emits the value returned by `supplier`.
///
/// The supplier runs inside the scheduled action, at most once per
/// subscription. An `Err` or a panic is delivered through `error`.
///
/// ```
/// use rxresume::prelude::*;
///
/// observable::from_callable(|| "42".parse::<i32>().map_err(Error::new), None)
///   .subscribe_fn(|v| assert_eq!(v, 42), |_| {}, || {});
/// ```
pub fn from_callable<T, F>(supplier: F, scheduler: Option<SchedulerRef>) -> Observable<T>
where
  T: 'static,
  F: Fn() -> Result<T, Error> + 'static,
{
  let supplier = Rc::new(supplier);
  Observable::new(move |mut observer, given| {
    let supplier = supplier.clone();
    resolve_scheduler(&scheduler, given).schedule_fn(move |_| match error::catch_unwind(|| supplier()) {
      Ok(value) => {
        observer.next(value);
        observer.complete();
      }
      Err(err) => observer.error(err),
    })
  })
}

/// Emits `value` `count` times, or forever when `count` is `None`.
///
/// Each occurrence is its own scheduled continuation:
///
/// ```
/// use rxresume::prelude::*;
/// use std::{cell::RefCell, rc::Rc};
///
/// let seen = Rc::new(RefCell::new(String::new()));
/// let c_seen = seen.clone();
/// observable::repeat_value('x', Some(3)).subscribe_fn(move |v| c_seen.borrow_mut().push(v), |_| {}, || {});
/// assert_eq!(*seen.borrow(), "xxx");
/// ```
///
/// On the current-thread trampoline an unbounded repeat runs inside
/// `subscribe` until the observer reports `is_closed`, so with an observer
/// that never closes the call does not return. Use a scheduler that queues,
/// such as [`ManualScheduler`](crate::scheduler::ManualScheduler), to keep the
/// disposable and step the repetition:
///
/// ```
/// use rxresume::prelude::*;
/// use std::{cell::Cell, rc::Rc};
///
/// let scheduler = ManualScheduler::new();
/// let count = Rc::new(Cell::new(0));
/// let c_count = count.clone();
/// let subscription = observable::repeat_value(1, None).subscribe_with_scheduler(
///   FnObserver::new(move |_: i32| c_count.set(c_count.get() + 1), |_| {}, || {}),
///   Some(Rc::new(scheduler.clone())),
/// );
/// while count.get() < 10 {
///   scheduler.run_next();
/// }
/// subscription.dispose();
/// assert_eq!(scheduler.flush(), 0);
/// assert_eq!(count.get(), 10);
/// ```
pub fn repeat_value<T>(value: T, count: Option<usize>) -> Observable<T>
where
  T: Clone + 'static,
{
  return_value(value, None).repeat(count)
}
