use super::{resolve_scheduler, Observable};
use crate::{
  disposable::Disposable,
  error::Error,
  observer::Observer,
  scheduler::{SchedulerExt, SchedulerRef},
};

/// Creates an observable that produces no values.
///
/// Completes from a scheduled action. Never emits an error.
///
/// # Examples
/// ```
/// use rxresume::prelude::*;
///
/// observable::empty::<i32>(None).subscribe_fn(|_| unreachable!(), |_| {}, || println!("done"));
/// ```
pub fn empty<T: 'static>(scheduler: Option<SchedulerRef>) -> Observable<T> {
  Observable::new(move |observer, given| {
    resolve_scheduler(&scheduler, given).schedule_fn(move |_| observer.complete())
  })
}

/// Creates an observable that emits no items, just terminates with an error.
///
/// # Arguments
///
/// * `err` - An error to emit and terminate with
pub fn throw<T: 'static>(err: Error, scheduler: Option<SchedulerRef>) -> Observable<T> {
  Observable::new(move |observer, given| {
    let err = err.clone();
    resolve_scheduler(&scheduler, given).schedule_fn(move |_| observer.error(err))
  })
}

/// Creates an observable that never emits and never terminates.
pub fn never<T: 'static>() -> Observable<T> { Observable::new(|_, _| Disposable::empty()) }
