use std::{
  cell::{Cell, RefCell},
  rc::Rc,
};

use super::{Disposable, DisposableLike};

/// Holds a replaceable inner disposable.
///
/// Assigning a new occupant disposes the previous one. Once the serial itself
/// is disposed, the current occupant and every later assignment are disposed
/// immediately.
#[derive(Clone, Default)]
pub struct SerialDisposable(Rc<Inner>);

#[derive(Default)]
struct Inner {
  disposed: Cell<bool>,
  current: RefCell<Option<Disposable>>,
}

impl SerialDisposable {
  pub fn new() -> Self { Self::default() }

  /// The current occupant, if any.
  pub fn get(&self) -> Option<Disposable> { self.0.current.borrow().clone() }

  /// Replaces the occupant, disposing the previous one.
  pub fn set(&self, disposable: Disposable) {
    if self.0.disposed.get() {
      disposable.dispose();
      return;
    }
    let old = self.0.current.replace(Some(disposable));
    if let Some(old) = old {
      old.dispose();
    }
  }
}

impl DisposableLike for SerialDisposable {
  fn dispose(&self) {
    if !self.0.disposed.replace(true) {
      let current = self.0.current.take();
      if let Some(current) = current {
        current.dispose();
      }
    }
  }

  #[inline]
  fn is_disposed(&self) -> bool { self.0.disposed.get() }
}
