//! Database error type for retry classification.

use std::fmt;
use thiserror::Error;

/// Error returned by a pool or connection call.
///
/// The variants mirror the error families a database driver raises, so the
/// classifier can decide retries without looking at messages. Driver errors
/// are converted once, at the adapter boundary (see `db::driver`).
#[derive(Debug, Error)]
pub enum DbError {
    /// Transport or session is unusable (reset, timeout, server gone away).
    #[error("interface error: {0}")]
    Interface(String),
    /// The server rejected or failed a statement or commit.
    #[error("operational error{}: {message}", OptCode(.code))]
    Operational {
        code: Option<String>,
        message: String,
    },
    /// The pool could not hand out a connection at all.
    #[error("pool error: {0}")]
    Pool(String),
    /// Anything the adapter could not place in one of the families above.
    #[error("{0}")]
    Other(String),
}

impl DbError {
    pub fn operational(message: impl Into<String>) -> Self {
        DbError::Operational {
            code: None,
            message: message.into(),
        }
    }
}

struct OptCode<'a>(&'a Option<String>);

impl fmt::Display for OptCode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(code) => write!(f, " ({})", code),
            None => Ok(()),
        }
    }
}

/// Phase of a write-then-read probe in which a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbePhase {
    Write,
    Commit,
    Read,
}

impl fmt::Display for ProbePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProbePhase::Write => "write",
            ProbePhase::Commit => "commit",
            ProbePhase::Read => "read",
        };
        f.write_str(s)
    }
}

/// A failed probe: the phase that failed and the error it failed with.
#[derive(Debug, Error)]
#[error("{phase} phase failed: {error}")]
pub struct ProbeFailure {
    pub phase: ProbePhase,
    #[source]
    pub error: DbError,
}

impl ProbeFailure {
    pub fn new(phase: ProbePhase, error: DbError) -> Self {
        Self { phase, error }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operational_display_includes_code_when_present() {
        let e = DbError::Operational {
            code: Some("1213".into()),
            message: "deadlock".into(),
        };
        assert_eq!(e.to_string(), "operational error (1213): deadlock");
        assert_eq!(
            DbError::operational("commit failed").to_string(),
            "operational error: commit failed"
        );
    }

    #[test]
    fn probe_failure_names_phase() {
        let f = ProbeFailure::new(ProbePhase::Commit, DbError::operational("nope"));
        assert_eq!(f.to_string(), "commit phase failed: operational error: nope");
    }
}
