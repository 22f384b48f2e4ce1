//! Classify database errors into the categories that drive retry decisions.

use super::error::DbError;
use std::fmt;

/// Failure category. Every retry and backoff decision is made on this alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Transport/session unusable; the connection must be discarded.
    ConnectionLost,
    /// A statement or commit failed; the connection may still be usable.
    OperationalFailure,
    /// No connection could be obtained from the pool. Always fatal.
    PoolExhausted,
    /// Not recognised. Retried like `OperationalFailure`, logged apart.
    Unknown,
}

impl ErrorCategory {
    /// Category used for retry purposes (`Unknown` is treated conservatively).
    pub fn effective(self) -> ErrorCategory {
        match self {
            ErrorCategory::Unknown => ErrorCategory::OperationalFailure,
            other => other,
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCategory::ConnectionLost => "connection-lost",
            ErrorCategory::OperationalFailure => "operational",
            ErrorCategory::PoolExhausted => "pool-exhausted",
            ErrorCategory::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Classify a database error. Pure function of the error value.
pub fn classify(e: &DbError) -> ErrorCategory {
    match e {
        DbError::Interface(_) => ErrorCategory::ConnectionLost,
        DbError::Operational { .. } => ErrorCategory::OperationalFailure,
        DbError::Pool(_) => ErrorCategory::PoolExhausted,
        DbError::Other(_) => ErrorCategory::Unknown,
    }
}
