//! Prelude module for convenient imports
//!
//! This module re-exports commonly used types and traits for easy access.

// Builders live in the module, as in `observable::return_value`
pub use crate::observable;
// Disposables
pub use crate::disposable::{
  CompositeDisposable, Disposable, DisposableLike, DisposeGuard, SerialDisposable,
  SingleAssignmentDisposable,
};
#[cfg(feature = "tokio-scheduler")]
pub use crate::observable::TokioLocalSpawner;
// Core types
pub use crate::observable::{FutureSource, Observable, Source};
// Observer trait and adapters
pub use crate::observer::{BoxedObserver, FnObserver, Observer};
// Schedulers
pub use crate::scheduler::{CurrentThreadScheduler, ManualScheduler, Scheduler, SchedulerExt, SchedulerRef};
pub use crate::error::Error;
