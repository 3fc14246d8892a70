use std::{cell::Cell, rc::Rc};

use once_cell::unsync::OnceCell;

use super::{Disposable, DisposableLike};
use crate::error::DisposableError;

/// Holds at most one inner disposable, assigned exactly once.
///
/// Disposing before the assignment marks the handle pre-disposed, so the
/// disposable assigned later is released immediately.
#[derive(Clone, Default)]
pub struct SingleAssignmentDisposable(Rc<Inner>);

#[derive(Default)]
struct Inner {
  disposed: Cell<bool>,
  current: OnceCell<Disposable>,
}

impl SingleAssignmentDisposable {
  pub fn new() -> Self { Self::default() }

  pub fn get(&self) -> Option<Disposable> { self.0.current.get().cloned() }

  /// Assigns the inner disposable.
  ///
  /// # Errors
  ///
  /// Returns [`DisposableError::AlreadyAssigned`] if a disposable was assigned
  /// before; the rejected disposable is left untouched.
  pub fn set(&self, disposable: Disposable) -> Result<(), DisposableError> {
    self
      .0
      .current
      .set(disposable.clone())
      .map_err(|_| DisposableError::AlreadyAssigned)?;
    if self.0.disposed.get() {
      disposable.dispose();
    }
    Ok(())
  }
}

impl DisposableLike for SingleAssignmentDisposable {
  fn dispose(&self) {
    if !self.0.disposed.replace(true) {
      if let Some(current) = self.0.current.get() {
        current.dispose();
      }
    }
  }

  #[inline]
  fn is_disposed(&self) -> bool { self.0.disposed.get() }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn second_assignment_is_rejected() {
    let single = SingleAssignmentDisposable::new();
    let first = Disposable::empty();
    let second = Disposable::empty();
    assert_eq!(single.set(first.clone()), Ok(()));
    assert_eq!(single.set(second.clone()), Err(DisposableError::AlreadyAssigned));
    assert!(!second.is_disposed());
    assert!(single.get().unwrap().ptr_eq(&first));
  }

  #[test]
  fn pre_disposed_releases_assignee() {
    let single = SingleAssignmentDisposable::new();
    single.dispose();
    assert!(single.is_disposed());
    let late = Disposable::empty();
    single.set(late.clone()).unwrap();
    assert!(late.is_disposed());
  }

  #[test]
  fn dispose_releases_assignee_once() {
    let single = SingleAssignmentDisposable::new();
    let count = Rc::new(Cell::new(0));
    let c_count = count.clone();
    single
      .set(Disposable::new(move || c_count.set(c_count.get() + 1)))
      .unwrap();
    single.dispose();
    single.dispose();
    assert_eq!(count.get(), 1);
  }
}
