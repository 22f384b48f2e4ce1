use super::classify::ErrorCategory;
use crate::config::BackoffConfig;
use std::time::Duration;

/// Decision returned by the backoff policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Do not retry at this scope.
    NoRetry,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Pauses between successful probe phases. These pace load; they are not
/// failure responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pacing {
    /// After a committed insert, before reading it back.
    InsertToRead,
    /// After a successful read, before the next attempt.
    ReadToNext,
}

/// Deterministic backoff policy, sized by failure severity.
///
/// All delays are whole multiples of `unit` (one second in real runs).
#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    pub unit: Duration,
    pub insert_to_read: u32,
    pub read_to_next: u32,
    /// Pause after a write or commit failure before the attempt is abandoned.
    pub operational: u32,
    /// First pause after a failed acquisition, taken before deciding anything.
    pub acquire_recovery: u32,
    /// Extra pause after a failed acquisition when the loop will carry on.
    pub acquire_escalation: u32,
    /// Pause after a connection failed to close cleanly.
    pub release_recovery: u32,
    /// Consecutive unproductive rounds after which an acquisition failure
    /// stops the round loop instead of being retried.
    pub max_failure_streak: u32,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            unit: Duration::from_secs(1),
            insert_to_read: 1,
            read_to_next: 2,
            operational: 5,
            acquire_recovery: 1,
            acquire_escalation: 4,
            release_recovery: 5,
            max_failure_streak: 1,
            max_delay: Duration::from_secs(60),
        }
    }
}

impl From<&BackoffConfig> for BackoffPolicy {
    fn from(cfg: &BackoffConfig) -> Self {
        Self {
            unit: Duration::from_millis(cfg.unit_ms),
            insert_to_read: cfg.insert_to_read,
            read_to_next: cfg.read_to_next,
            operational: cfg.operational,
            acquire_recovery: cfg.acquire_recovery,
            acquire_escalation: cfg.acquire_escalation,
            release_recovery: cfg.release_recovery,
            max_failure_streak: cfg.max_failure_streak,
            max_delay: Duration::from_secs(cfg.max_delay_secs),
        }
    }
}

impl BackoffPolicy {
    /// Policy with every delay collapsed to zero (same decisions, no waiting).
    pub fn immediate() -> Self {
        Self {
            unit: Duration::ZERO,
            ..Self::default()
        }
    }

    fn units(&self, n: u32) -> Duration {
        self.unit.saturating_mul(n).min(self.max_delay)
    }

    pub fn pacing(&self, pacing: Pacing) -> Duration {
        match pacing {
            Pacing::InsertToRead => self.units(self.insert_to_read),
            Pacing::ReadToNext => self.units(self.read_to_next),
        }
    }

    /// Pause taken right after any failed acquisition.
    pub fn acquire_recovery(&self) -> Duration {
        self.units(self.acquire_recovery)
    }

    /// Pause taken after a connection failed to close.
    pub fn release_recovery(&self) -> Duration {
        self.units(self.release_recovery)
    }

    /// True once `failure_streak` consecutive unproductive rounds count as
    /// sustained failure.
    pub fn is_sustained(&self, failure_streak: u32) -> bool {
        failure_streak >= self.max_failure_streak
    }

    /// Decide how to respond to a classified failure.
    ///
    /// `failure_streak` is the number of consecutive unproductive rounds
    /// before this one. `ConnectionLost` is answered at round scope: retried
    /// with an escalating delay until the streak is sustained.
    /// `PoolExhausted` is never retried.
    pub fn delay_for(&self, category: ErrorCategory, failure_streak: u32) -> RetryDecision {
        match category.effective() {
            ErrorCategory::PoolExhausted => RetryDecision::NoRetry,
            ErrorCategory::ConnectionLost => {
                if self.is_sustained(failure_streak) {
                    return RetryDecision::NoRetry;
                }
                // escalation * 2^streak, capped.
                let exp = 1u32 << failure_streak.min(8);
                let raw = self
                    .unit
                    .saturating_mul(self.acquire_escalation.saturating_mul(exp));
                RetryDecision::RetryAfter(raw.min(self.max_delay))
            }
            ErrorCategory::OperationalFailure | ErrorCategory::Unknown => {
                RetryDecision::RetryAfter(self.units(self.operational))
            }
        }
    }
}
