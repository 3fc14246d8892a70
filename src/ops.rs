//! Operators implemented as inherent methods on
//! [`Observable`](crate::observable::Observable).
//!
//! The resumption operator `on_error_resume_next` lives next to the engine in
//! [`observable`](crate::observable).

mod repeat;
