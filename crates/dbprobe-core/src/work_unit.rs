//! Inner retry scope: up to N probes on one borrowed connection.

use crate::db::ProbeConnection;
use crate::probe::ProbeOperation;
use crate::retry::{
    classify, BackoffPolicy, ErrorCategory, Pacing, ProbeFailure, ProbePhase, RetryDecision,
};
use crate::round_loop::RoundState;
use std::io::Write;

/// Bookkeeping for one attempt inside a work unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptState {
    pub index: u32,
    pub last_error: Option<ErrorCategory>,
}

/// How a work unit ended.
#[derive(Debug)]
pub struct WorkOutcome {
    /// Probes started (completed or not).
    pub attempts: u32,
    /// Probes whose write, commit and read all succeeded.
    pub completed: u32,
    /// The failure that cut the unit short, if any.
    pub abandoned: Option<ProbeFailure>,
}

impl WorkOutcome {
    /// A round counts as productive only if it ran clean: at least one
    /// full probe and no abandonment.
    pub fn is_productive(&self) -> bool {
        self.completed > 0 && self.abandoned.is_none()
    }
}

/// Runs the bounded attempt sequence for one round.
pub struct WorkUnit<'a, W: Write> {
    pub probe: &'a ProbeOperation,
    pub policy: &'a BackoffPolicy,
    pub attempts: u32,
    pub out: &'a mut W,
}

impl<W: Write> WorkUnit<'_, W> {
    /// Probe `attempts` times on `conn`. Success does not end the unit
    /// early; the first failure does.
    pub async fn run<C: ProbeConnection>(
        &mut self,
        conn: &mut C,
        round: &RoundState,
    ) -> WorkOutcome {
        let mut outcome = WorkOutcome {
            attempts: 0,
            completed: 0,
            abandoned: None,
        };

        for index in 0..self.attempts {
            let mut attempt = AttemptState {
                index,
                last_error: None,
            };
            outcome.attempts += 1;

            match self.probe.write_then_read(conn, self.policy).await {
                Ok(record) => {
                    outcome.completed += 1;
                    if let Err(e) = writeln!(self.out, "{}", record.confirmation()) {
                        tracing::warn!("could not write probe confirmation: {}", e);
                    }
                    tokio::time::sleep(self.policy.pacing(Pacing::ReadToNext)).await;
                }
                Err(failure) => {
                    attempt.last_error = Some(classify(&failure.error));
                    self.abandon(&failure, round, &attempt).await;
                    outcome.abandoned = Some(failure);
                    break;
                }
            }
        }

        outcome
    }

    async fn abandon(&self, failure: &ProbeFailure, round: &RoundState, attempt: &AttemptState) {
        let category = attempt.last_error.unwrap_or(ErrorCategory::Unknown);
        tracing::warn!(
            round = round.index,
            attempt = attempt.index,
            %category,
            "{}",
            failure
        );

        // Connection loss and read failures abandon right away; write and
        // commit rejections are paced first.
        let paced = match failure.phase {
            ProbePhase::Read => false,
            ProbePhase::Write => category != ErrorCategory::ConnectionLost,
            ProbePhase::Commit => true,
        };
        if !paced {
            return;
        }
        let category = match category {
            // Commit failures are operational whatever the driver said.
            ErrorCategory::ConnectionLost | ErrorCategory::PoolExhausted => {
                ErrorCategory::OperationalFailure
            }
            other => other,
        };
        let decision = self.policy.delay_for(category, round.failure_streak);
        if let RetryDecision::RetryAfter(d) = decision {
            tokio::time::sleep(d).await;
        }
    }
}
