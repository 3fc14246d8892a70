//! The `Observable` type and its builders.
//!
//! An [`Observable`] is an immutable, cheaply clonable description of a push
//! sequence. Subscribing runs its subscribe function once, synchronously, and
//! yields the [`Disposable`] that cancels that one execution.

use std::{
  cell::Cell,
  fmt::Debug,
  panic::{self, AssertUnwindSafe},
  rc::Rc,
};

use crate::{
  disposable::Disposable,
  error::{panic_message, Error},
  observer::{AutoDetachObserver, BoxedObserver, FnObserver, Observer},
  scheduler::{CurrentThreadScheduler, SchedulerRef},
};

mod from_future;
mod on_error_resume_next;
mod return_value;
mod trivial;

pub use from_future::*;
pub use on_error_resume_next::*;
pub use return_value::*;
pub use trivial::*;

type SubscribeFn<T> = dyn Fn(BoxedObserver<T>, Option<SchedulerRef>) -> Disposable;

/// A push-based sequence of `T` values that ends with at most one `error` or
/// `complete`.
pub struct Observable<T> {
  subscribe: Rc<SubscribeFn<T>>,
}

impl<T> Clone for Observable<T> {
  fn clone(&self) -> Self { Observable { subscribe: self.subscribe.clone() } }
}

impl<T> Debug for Observable<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Observable").finish_non_exhaustive()
  }
}

impl<T: 'static> Observable<T> {
  /// param `subscribe`: the function that is called when the Observable is
  /// subscribed to. It is given the observer to notify and the scheduler the
  /// subscriber asked for, and returns the disposable for this execution.
  ///
  /// ```
  /// use rxresume::prelude::*;
  ///
  /// let numbers = Observable::new(|mut observer: BoxedObserver<i32>, _| {
  ///   observer.next(1);
  ///   observer.next(2);
  ///   observer.complete();
  ///   Disposable::empty()
  /// });
  /// numbers.subscribe_fn(|v| println!("{v}"), |_| {}, || {});
  /// ```
  pub fn new<F>(subscribe: F) -> Self
  where
    F: Fn(BoxedObserver<T>, Option<SchedulerRef>) -> Disposable + 'static,
  {
    Observable { subscribe: Rc::new(subscribe) }
  }

  /// Subscribes without an explicit scheduler.
  pub fn subscribe<O>(&self, observer: O) -> Disposable
  where
    O: Observer<T> + 'static,
  {
    self.subscribe_with_scheduler(observer, None)
  }

  /// Subscribes, offering `scheduler` to the sources that schedule work.
  ///
  /// The returned disposable detaches `observer` and releases the source.
  /// The source is also released as soon as a terminal notification has been
  /// delivered. A panic in the subscribe function reaches `observer` as
  /// [`Error::Panicked`]; it never unwinds into the caller.
  ///
  /// A panic raised by `observer` itself is not a source failure: it unwinds
  /// out of this call unchanged.
  pub fn subscribe_with_scheduler<O>(&self, observer: O, scheduler: Option<SchedulerRef>) -> Disposable
  where
    O: Observer<T> + 'static,
  {
    let observer = AutoDetachObserver::new(observer);
    let delivering = Rc::new(Cell::new(false));
    let sink: BoxedObserver<T> = Box::new(DeliveryTracker {
      observer: observer.clone(),
      delivering: delivering.clone(),
    });
    match panic::catch_unwind(AssertUnwindSafe(|| (self.subscribe)(sink, scheduler))) {
      Ok(subscription) => observer.attach(subscription),
      Err(payload) if delivering.get() => panic::resume_unwind(payload),
      Err(payload) => {
        let err = Error::Panicked(panic_message(&*payload).into());
        observer.clone().error(err);
      }
    }
    Disposable::wrap(observer)
  }

  /// Subscribes three closures.
  pub fn subscribe_fn<N, E, C>(&self, next: N, error: E, complete: C) -> Disposable
  where
    N: FnMut(T) + 'static,
    E: FnOnce(Error) + 'static,
    C: FnOnce() + 'static,
  {
    self.subscribe(FnObserver::new(next, error, complete))
  }
}

/// The sink handed to the subscribe function. The flag stays set if the
/// downstream observer unwinds, which tells its panics apart from the source's.
struct DeliveryTracker<O> {
  observer: O,
  delivering: Rc<Cell<bool>>,
}

impl<O, Item> Observer<Item> for DeliveryTracker<O>
where
  O: Observer<Item>,
{
  fn next(&mut self, value: Item) {
    self.delivering.set(true);
    self.observer.next(value);
    self.delivering.set(false);
  }

  fn error(self, err: Error) {
    self.delivering.set(true);
    self.observer.error(err);
    self.delivering.set(false);
  }

  fn complete(self) {
    self.delivering.set(true);
    self.observer.complete();
    self.delivering.set(false);
  }

  #[inline]
  fn is_closed(&self) -> bool { self.observer.is_closed() }
}

/// Picks the builder's own scheduler, then the subscriber's, then the
/// current-thread trampoline.
pub(crate) fn resolve_scheduler(own: &Option<SchedulerRef>, given: Option<SchedulerRef>) -> SchedulerRef {
  own
    .clone()
    .or(given)
    .unwrap_or_else(CurrentThreadScheduler::singleton)
}
