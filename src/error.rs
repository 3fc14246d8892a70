//! Error types carried through `Observer::error`.
//!
//! The kernel has a single notification error, [`Error`]. Failures raised by
//! user code (suppliers, factories, subscribe functions) are converted into it
//! at the call site through [`catch_unwind`], so nothing ever propagates across
//! a `subscribe` call as a panic.

use std::{
  any::Any,
  panic::{self, AssertUnwindSafe},
  sync::Arc,
};

use futures::{channel::oneshot::Canceled, future::Aborted};
use thiserror::Error;

/// The error delivered to [`Observer::error`](crate::observer::Observer::error).
///
/// Cheap to clone, so the resumption engine can carry it into the next
/// factory while still logging it.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum Error {
  /// A plain message, usually built from `&str` or `String`.
  #[error("{0}")]
  Message(Arc<str>),
  /// A wrapped third-party error.
  #[error(transparent)]
  Source(Arc<dyn std::error::Error + Send + Sync>),
  /// A future was cancelled before it produced a value.
  #[error("future was cancelled before it produced a value")]
  Cancelled,
  /// User code panicked while producing a value.
  #[error("user code panicked: {0}")]
  Panicked(Arc<str>),
  /// Misuse of a disposable primitive.
  #[error(transparent)]
  Disposable(#[from] DisposableError),
}

impl Error {
  /// Builds an error from a message.
  pub fn msg(message: impl Into<String>) -> Self {
    let message: String = message.into();
    Error::Message(message.into())
  }

  /// Wraps any standard error.
  pub fn new<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Error::Source(Arc::new(err))
  }

  /// Whether this error reports a cancelled future.
  pub fn is_cancelled(&self) -> bool { matches!(self, Error::Cancelled) }

  /// Returns a short stable label (snake_case) for use in logs.
  ///
  /// ```
  /// use rxresume::Error;
  ///
  /// assert_eq!(Error::Cancelled.as_label(), "cancelled");
  /// assert_eq!(Error::msg("boom").as_label(), "message");
  /// ```
  pub fn as_label(&self) -> &'static str {
    match self {
      Error::Message(_) => "message",
      Error::Source(_) => "source",
      Error::Cancelled => "cancelled",
      Error::Panicked(_) => "panicked",
      Error::Disposable(_) => "disposable",
    }
  }
}

impl From<&str> for Error {
  fn from(message: &str) -> Self { Error::Message(message.into()) }
}

impl From<String> for Error {
  fn from(message: String) -> Self { Error::Message(message.into()) }
}

impl From<Canceled> for Error {
  fn from(_: Canceled) -> Self { Error::Cancelled }
}

impl From<Aborted> for Error {
  fn from(_: Aborted) -> Self { Error::Cancelled }
}

/// Errors raised when a disposable primitive is used against its contract.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DisposableError {
  #[error("single-assignment disposable was already assigned")]
  AlreadyAssigned,
}

/// Runs user code, turning a panic into [`Error::Panicked`].
pub(crate) fn catch_unwind<R>(f: impl FnOnce() -> Result<R, Error>) -> Result<R, Error> {
  panic::catch_unwind(AssertUnwindSafe(f))
    .unwrap_or_else(|payload| Err(Error::Panicked(panic_message(&*payload).into())))
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
  if let Some(message) = payload.downcast_ref::<&'static str>() {
    (*message).to_owned()
  } else if let Some(message) = payload.downcast_ref::<String>() {
    message.clone()
  } else {
    "non-string panic payload".to_owned()
  }
}
