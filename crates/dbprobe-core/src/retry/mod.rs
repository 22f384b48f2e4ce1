//! Retry and backoff policy.
//!
//! This module holds the database error type, the pure classifier that maps
//! it onto failure categories, and the deterministic backoff policy that the
//! work unit and round loop consult when something fails.

mod classify;
mod error;
mod policy;

pub use classify::{classify, ErrorCategory};
pub use error::{DbError, ProbeFailure, ProbePhase};
pub use policy::{BackoffPolicy, Pacing, RetryDecision};
