//! Cancellation handles.
//!
//! A disposable is released at most once: the first `dispose` call performs
//! the teardown, every later call is a no-op. All primitives are cheap `Rc`
//! handles, so clones observe and release the same underlying state.

use std::{
  cell::{Cell, RefCell},
  fmt::{Debug, Formatter},
  rc::Rc,
};

mod composite;
mod serial;
mod single_assignment;

pub use composite::CompositeDisposable;
pub use serial::SerialDisposable;
pub use single_assignment::SingleAssignmentDisposable;

/// Something that can be released.
pub trait DisposableLike {
  /// Releases the resource. Idempotent.
  fn dispose(&self);

  fn is_disposed(&self) -> bool;
}

// ============================================================================
// Disposable - type-erased handle
// ============================================================================

/// A shared, type-erased cancellation handle.
#[derive(Clone)]
pub struct Disposable(Rc<dyn DisposableLike>);

impl Disposable {
  /// Runs `action` on first disposal.
  pub fn new(action: impl FnOnce() + 'static) -> Self { Disposable(Rc::new(ActionDisposable::new(action))) }

  /// A handle with no teardown, only a disposed flag.
  pub fn empty() -> Self { Disposable(Rc::new(ActionDisposable::default())) }

  /// A handle that is already disposed.
  pub fn disposed() -> Self {
    let d = Disposable::empty();
    d.dispose();
    d
  }

  /// Erases a concrete disposable.
  pub fn wrap<D: DisposableLike + 'static>(disposable: D) -> Self { Disposable(Rc::new(disposable)) }

  /// Whether both handles release the same resource.
  pub fn ptr_eq(&self, other: &Disposable) -> bool { Rc::ptr_eq(&self.0, &other.0) }

  /// Activates "RAII" behavior for this disposable: it is disposed as soon as
  /// the returned guard goes out of scope.
  ///
  /// **Attention:** If you don't assign the return value to a variable,
  /// `dispose()` is called immediately.
  pub fn dispose_when_dropped(self) -> DisposeGuard { DisposeGuard(self) }
}

impl DisposableLike for Disposable {
  #[inline]
  fn dispose(&self) { self.0.dispose() }

  #[inline]
  fn is_disposed(&self) -> bool { self.0.is_disposed() }
}

impl Default for Disposable {
  fn default() -> Self { Disposable::empty() }
}

impl Debug for Disposable {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Disposable")
      .field("is_disposed", &self.is_disposed())
      .finish()
  }
}

macro_rules! impl_into_disposable {
  ($($t: ty),*) => {
    $(
      impl From<$t> for Disposable {
        #[inline]
        fn from(d: $t) -> Self { Disposable::wrap(d) }
      }
    )*
  };
}

impl_into_disposable!(
  ActionDisposable,
  SerialDisposable,
  SingleAssignmentDisposable,
  CompositeDisposable
);

// ============================================================================
// ActionDisposable
// ============================================================================

/// Runs a teardown closure on first disposal.
#[derive(Default)]
pub struct ActionDisposable {
  disposed: Cell<bool>,
  action: RefCell<Option<Box<dyn FnOnce()>>>,
}

impl ActionDisposable {
  pub fn new(action: impl FnOnce() + 'static) -> Self {
    ActionDisposable {
      disposed: Cell::new(false),
      action: RefCell::new(Some(Box::new(action))),
    }
  }
}

impl DisposableLike for ActionDisposable {
  fn dispose(&self) {
    if !self.disposed.replace(true) {
      // released before running so the action may touch this handle again
      let action = self.action.borrow_mut().take();
      if let Some(action) = action {
        action();
      }
    }
  }

  #[inline]
  fn is_disposed(&self) -> bool { self.disposed.get() }
}

// ============================================================================
// DisposeGuard
// ============================================================================

/// An RAII implementation of a "scoped subscribed" disposable.
/// When this structure is dropped (falls out of scope), the disposable is
/// disposed.
///
/// If you want to drop it immediately, wrap it in its own scope
#[derive(Debug)]
#[must_use]
pub struct DisposeGuard(Disposable);

impl Drop for DisposeGuard {
  #[inline]
  fn drop(&mut self) { self.0.dispose() }
}
