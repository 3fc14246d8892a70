use std::{
  cell::{Cell, RefCell},
  panic::{self, AssertUnwindSafe},
  rc::Rc,
};

use smallvec::SmallVec;
use tracing::error;

use super::{Disposable, DisposableLike};
use crate::error::panic_message;

/// Owns a set of disposables and releases them together, in insertion order.
///
/// A member that panics while disposing does not stop the others: every
/// member is disposed first, then the first panic is resumed.
#[derive(Clone, Default)]
pub struct CompositeDisposable(Rc<Inner>);

#[derive(Default)]
struct Inner {
  disposed: Cell<bool>,
  members: RefCell<SmallVec<[Disposable; 2]>>,
}

impl CompositeDisposable {
  pub fn new(members: impl IntoIterator<Item = Disposable>) -> Self {
    CompositeDisposable(Rc::new(Inner {
      disposed: Cell::new(false),
      members: RefCell::new(members.into_iter().collect()),
    }))
  }

  /// Adds a member; disposes it right away if the composite is disposed.
  pub fn add(&self, disposable: Disposable) {
    if self.0.disposed.get() {
      disposable.dispose();
    } else {
      let mut members = self.0.members.borrow_mut();
      members.retain(|m| !m.is_disposed());
      members.push(disposable);
    }
  }

  /// Removes and disposes `disposable`. Returns whether it was a member.
  pub fn remove(&self, disposable: &Disposable) -> bool {
    let removed = {
      let mut members = self.0.members.borrow_mut();
      let pos = members.iter().position(|m| m.ptr_eq(disposable));
      pos.map(|pos| members.remove(pos))
    };
    match removed {
      Some(member) => {
        member.dispose();
        true
      }
      None => false,
    }
  }

  #[inline]
  pub fn len(&self) -> usize { self.0.members.borrow().len() }

  #[inline]
  pub fn is_empty(&self) -> bool { self.0.members.borrow().is_empty() }
}

impl DisposableLike for CompositeDisposable {
  fn dispose(&self) {
    if self.0.disposed.replace(true) {
      return;
    }
    let members = std::mem::take(&mut *self.0.members.borrow_mut());
    let mut first_panic = None;
    for member in members {
      if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| member.dispose())) {
        error!(reason = %panic_message(&*payload), "composite member panicked while disposing");
        first_panic.get_or_insert(payload);
      }
    }
    if let Some(payload) = first_panic {
      panic::resume_unwind(payload);
    }
  }

  #[inline]
  fn is_disposed(&self) -> bool { self.0.disposed.get() }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn recorder(log: &Rc<RefCell<Vec<usize>>>, id: usize) -> Disposable {
    let log = log.clone();
    Disposable::new(move || log.borrow_mut().push(id))
  }

  #[test]
  fn disposes_in_declared_order() {
    let log = Rc::new(RefCell::new(vec![]));
    let composite = CompositeDisposable::new([recorder(&log, 1), recorder(&log, 2)]);
    composite.add(recorder(&log, 3));
    assert_eq!(composite.len(), 3);
    composite.dispose();
    composite.dispose();
    assert_eq!(*log.borrow(), vec![1, 2, 3]);
    assert!(composite.is_empty());
  }

  #[test]
  fn add_after_dispose_releases_immediately() {
    let composite = CompositeDisposable::default();
    composite.dispose();
    let late = Disposable::empty();
    composite.add(late.clone());
    assert!(late.is_disposed());
    assert!(composite.is_empty());
  }

  #[test]
  fn remove_disposes_member() {
    let a = Disposable::empty();
    let b = Disposable::empty();
    let composite = CompositeDisposable::new([a.clone(), b.clone()]);
    assert!(composite.remove(&a));
    assert!(a.is_disposed());
    assert!(!composite.remove(&a));
    assert_eq!(composite.len(), 1);
    assert!(!b.is_disposed());
  }

  #[test]
  fn panicking_member_does_not_stop_siblings() {
    let log = Rc::new(RefCell::new(vec![]));
    let composite = CompositeDisposable::new([
      recorder(&log, 1),
      Disposable::new(|| panic!("teardown failed")),
      recorder(&log, 3),
    ]);
    let res = panic::catch_unwind(AssertUnwindSafe(|| composite.dispose()));
    assert!(res.is_err());
    assert_eq!(*log.borrow(), vec![1, 3]);
    assert!(composite.is_disposed());
  }
}
