//! # rxresume: a push-based reactive kernel
//!
//! The subscription, cancellation and resumption core of Reactive Extensions,
//! for single-threaded use.
//!
//! ## Quick Start
//!
//! ```rust
//! use rxresume::prelude::*;
//!
//! // A failing source falls through to the next one.
//! observable::on_error_resume_next([
//!   observable::throw(Error::msg("offline"), None),
//!   observable::repeat_value(7, Some(2)),
//! ])
//! .subscribe_fn(|v| println!("Value: {v}"), |_| {}, || println!("done"));
//! ```
//!
//! ## Key Concepts
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Observable`] | A reusable description of a push sequence |
//! | [`Observer`] | Consumes `next`, `error`, and `complete` events |
//! | [`Disposable`] | Idempotent handle that cancels a subscription |
//! | [`Scheduler`] | Trampolined executor for scheduled actions |
//! | [`Source`] | One step of an `on_error_resume_next` chain |
//!
//! ## Feature Flags
//!
//! - **`tokio-scheduler`**: `TokioLocalSpawner`, to drive bridged futures on
//!   a `tokio::task::LocalSet`
//!
//! [`Observable`]: observable::Observable
//! [`Observer`]: observer::Observer
//! [`Disposable`]: disposable::Disposable
//! [`Scheduler`]: scheduler::Scheduler
//! [`Source`]: observable::Source

pub mod disposable;
pub mod error;
pub mod observable;
pub mod observer;
pub mod ops;
pub mod prelude;
pub mod scheduler;

pub use error::Error;
// Re-export the prelude module
pub use prelude::*;

#[cfg(doctest)]
mod __markdown_doctests {
  mod readme {
    #![doc = include_str!("../README.md")]
  }
}
