//! Observer trait and implementations
//!
//! The Observer trait defines the consumer of data in the reactive pattern.
//! It provides three methods: next (for values), error (for errors), and
//! complete (for stream completion).

use std::{
  cell::{Cell, RefCell},
  rc::Rc,
};

use crate::{
  disposable::{Disposable, DisposableLike, SerialDisposable},
  error::Error,
};

// ============================================================================
// Observer Trait
// ============================================================================

/// Observer trait: The consumer of data in reactive programming
///
/// An Observer receives values, errors, and completion notifications from
/// an Observable.
pub trait Observer<Item> {
  /// Receive the next value from the observable
  fn next(&mut self, value: Item);

  /// Handle an error from the observable
  ///
  /// This consumes the observer, as no more values can be emitted after an
  /// error
  fn error(self, err: Error);

  /// Handle completion of the observable
  ///
  /// This consumes the observer, as no more values can be emitted after
  /// completion
  fn complete(self);

  /// Checks if the observer is closed.
  ///
  /// Sources that loop (`repeat`, the resumption engine) check this before
  /// every continuation and stop early once it returns `true`.
  fn is_closed(&self) -> bool;
}

// ============================================================================
// DynObserver Trait - Object-safe Observer
// ============================================================================

/// Helper trait to enable object-safe Observers (Box<dyn Observer>)
///
/// Standard Observer trait is not object-safe because methods take `self` by
/// value. DynObserver mirrors the interface but adapts it for vtables.
pub trait DynObserver<Item> {
  fn box_next(&mut self, value: Item);
  fn box_error(self: Box<Self>, err: Error);
  fn box_complete(self: Box<Self>);
  fn box_is_closed(&self) -> bool;
}

impl<T, Item> DynObserver<Item> for T
where
  T: Observer<Item>,
{
  fn box_next(&mut self, value: Item) { self.next(value); }
  fn box_error(self: Box<Self>, err: Error) { (*self).error(err); }
  fn box_complete(self: Box<Self>) { (*self).complete(); }
  fn box_is_closed(&self) -> bool { self.is_closed() }
}

/// The observer type every subscribe function receives.
pub type BoxedObserver<Item> = Box<dyn DynObserver<Item>>;

impl<Item> Observer<Item> for BoxedObserver<Item> {
  #[inline]
  fn next(&mut self, value: Item) { (**self).box_next(value) }

  #[inline]
  fn error(self, err: Error) { self.box_error(err) }

  #[inline]
  fn complete(self) { self.box_complete() }

  #[inline]
  fn is_closed(&self) -> bool { (**self).box_is_closed() }
}

// ============================================================================
// FnObserver - Closure adapter
// ============================================================================

/// Observer built from three closures.
///
/// ```
/// use rxresume::prelude::*;
///
/// let mut observer = FnObserver::new(|v: i32| println!("{v}"), |e: Error| eprintln!("{e}"), || {});
/// observer.next(1);
/// observer.complete();
/// ```
#[derive(Clone)]
pub struct FnObserver<N, E, C> {
  next: N,
  error: E,
  complete: C,
}

impl<N, E, C> FnObserver<N, E, C>
where
  E: FnOnce(Error),
  C: FnOnce(),
{
  pub fn new(next: N, error: E, complete: C) -> Self { FnObserver { next, error, complete } }
}

impl<Item, N, E, C> Observer<Item> for FnObserver<N, E, C>
where
  N: FnMut(Item),
  E: FnOnce(Error),
  C: FnOnce(),
{
  #[inline]
  fn next(&mut self, value: Item) { (self.next)(value) }

  #[inline]
  fn error(self, err: Error) { (self.error)(err) }

  #[inline]
  fn complete(self) { (self.complete)() }

  #[inline]
  fn is_closed(&self) -> bool { false }
}

// ============================================================================
// SharedObserver - terminal-once cell
// ============================================================================

/// Shared ownership observer.
///
/// Clones feed the same inner observer. The first terminal call takes the
/// inner observer out, so at most one `error`/`complete` ever reaches it no
/// matter how many clones try. `close` detaches it without a notification.
///
/// The inner observer is borrowed for the duration of each call and must not
/// re-enter the same `SharedObserver` with a terminal notification.
pub struct SharedObserver<O>(Rc<SharedSlot<O>>);

struct SharedSlot<O> {
  closed: Cell<bool>,
  observer: RefCell<Option<O>>,
}

impl<O> SharedObserver<O> {
  pub fn new(observer: O) -> Self {
    SharedObserver(Rc::new(SharedSlot {
      closed: Cell::new(false),
      observer: RefCell::new(Some(observer)),
    }))
  }

  /// Detaches the inner observer. Later notifications are dropped.
  pub fn close(&self) {
    self.0.closed.set(true);
    // a busy observer is released by `next` once its call returns
    let detached = self
      .0
      .observer
      .try_borrow_mut()
      .ok()
      .and_then(|mut slot| slot.take());
    drop(detached);
  }

  fn take(&self) -> Option<O> {
    if self.0.closed.replace(true) {
      return None;
    }
    self.0.observer.borrow_mut().take()
  }
}

impl<O> Clone for SharedObserver<O> {
  fn clone(&self) -> Self { SharedObserver(self.0.clone()) }
}

impl<O, Item> Observer<Item> for SharedObserver<O>
where
  O: Observer<Item>,
{
  fn next(&mut self, value: Item) {
    if self.0.closed.get() {
      return;
    }
    let mut slot = self.0.observer.borrow_mut();
    if let Some(observer) = slot.as_mut() {
      observer.next(value);
    }
    if self.0.closed.get() {
      let detached = slot.take();
      drop(slot);
      drop(detached);
    }
  }

  fn error(self, err: Error) {
    if let Some(observer) = self.take() {
      observer.error(err);
    }
  }

  fn complete(self) {
    if let Some(observer) = self.take() {
      observer.complete();
    }
  }

  fn is_closed(&self) -> bool {
    self.0.closed.get()
      || self
        .0
        .observer
        .try_borrow()
        .is_ok_and(|slot| slot.as_ref().is_none_or(Observer::is_closed))
  }
}

// ============================================================================
// AutoDetachObserver - the subscribe boundary
// ============================================================================

/// Wraps the observer handed to `Observable::subscribe`.
///
/// After a terminal notification it disposes the source subscription; when
/// disposed it detaches the observer so no new notification reaches it.
pub struct AutoDetachObserver<O> {
  observer: SharedObserver<O>,
  subscription: SerialDisposable,
}

impl<O> AutoDetachObserver<O> {
  pub fn new(observer: O) -> Self {
    AutoDetachObserver {
      observer: SharedObserver::new(observer),
      subscription: SerialDisposable::new(),
    }
  }

  /// Attaches the source subscription. Disposed right away if the observer
  /// already terminated or was disposed.
  pub fn attach(&self, subscription: Disposable) { self.subscription.set(subscription); }
}

impl<O> Clone for AutoDetachObserver<O> {
  fn clone(&self) -> Self {
    AutoDetachObserver {
      observer: self.observer.clone(),
      subscription: self.subscription.clone(),
    }
  }
}

impl<O, Item> Observer<Item> for AutoDetachObserver<O>
where
  O: Observer<Item>,
{
  #[inline]
  fn next(&mut self, value: Item) { self.observer.next(value) }

  fn error(self, err: Error) {
    self.observer.error(err);
    self.subscription.dispose();
  }

  fn complete(self) {
    self.observer.complete();
    self.subscription.dispose();
  }

  #[inline]
  fn is_closed(&self) -> bool { self.observer.is_closed() }
}

impl<O> DisposableLike for AutoDetachObserver<O> {
  fn dispose(&self) {
    self.observer.close();
    self.subscription.dispose();
  }

  fn is_disposed(&self) -> bool { self.subscription.is_disposed() }
}

// ============================================================================
// Tests
// ============================================================================
