//! Outer retry scope: bounded rounds, one borrowed connection per round.

use crate::config::ProbeConfig;
use crate::db::{ConnectionLease, ConnectionPool};
use crate::probe::ProbeOperation;
use crate::retry::{classify, BackoffPolicy, DbError, ErrorCategory, RetryDecision};
use crate::work_unit::WorkUnit;
use std::io::Write;

/// Bookkeeping for one round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundState {
    pub index: u32,
    pub productive: bool,
    /// Consecutive unproductive rounds before this one.
    pub failure_streak: u32,
}

/// Counters over a whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub rounds_run: u32,
    pub productive_rounds: u32,
    pub attempts: u32,
    pub probes: u32,
    pub acquisitions: u32,
    pub acquire_failures: u32,
    pub release_failures: u32,
}

/// How the round loop ended.
#[derive(Debug)]
pub enum LoopOutcome {
    /// Every round ran.
    Completed(LoopStats),
    /// Acquisition kept failing while failure was already sustained.
    FailedFast(LoopStats),
    /// The pool could not supply a connection. Not retried.
    Fatal { error: DbError, stats: LoopStats },
}

impl LoopOutcome {
    pub fn stats(&self) -> &LoopStats {
        match self {
            LoopOutcome::Completed(stats) | LoopOutcome::FailedFast(stats) => stats,
            LoopOutcome::Fatal { stats, .. } => stats,
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, LoopOutcome::Fatal { .. })
    }

    /// Process exit status: 1 for pool exhaustion, 0 otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.is_fatal() {
            1
        } else {
            0
        }
    }
}

enum AcquireFlow {
    NextRound,
    Stop(LoopOutcome),
}

/// Drives `rounds` rounds against `pool`.
///
/// The held connection is an `Option`: at most one lease exists at a time,
/// and it is released before the next round acquires.
pub struct RoundLoop<'a, P: ConnectionPool, W: Write> {
    pool: &'a P,
    probe: ProbeOperation,
    policy: BackoffPolicy,
    limits: ProbeConfig,
    out: &'a mut W,
    held: Option<ConnectionLease<P::Conn>>,
    failure_streak: u32,
    stats: LoopStats,
}

impl<'a, P: ConnectionPool, W: Write> RoundLoop<'a, P, W> {
    pub fn new(
        pool: &'a P,
        probe: ProbeOperation,
        policy: BackoffPolicy,
        limits: ProbeConfig,
        out: &'a mut W,
    ) -> Self {
        Self {
            pool,
            probe,
            policy,
            limits,
            out,
            held: None,
            failure_streak: 0,
            stats: LoopStats::default(),
        }
    }

    /// Start with an already borrowed connection; round 0 uses it instead
    /// of acquiring.
    pub fn with_connection(mut self, lease: ConnectionLease<P::Conn>) -> Self {
        self.held = Some(lease);
        self
    }

    /// Start as if `streak` unproductive rounds had already happened.
    pub fn with_failure_streak(mut self, streak: u32) -> Self {
        self.failure_streak = streak;
        self
    }

    pub async fn run(mut self) -> LoopOutcome {
        let pool = self.pool;
        tracing::info!(
            "probing `{}` through pool '{}' (capacity {}): {} rounds x {} attempts",
            self.probe.table(),
            pool.name(),
            pool.capacity(),
            self.limits.rounds,
            self.limits.attempts
        );

        for index in 0..self.limits.rounds {
            let mut round = RoundState {
                index,
                productive: false,
                failure_streak: self.failure_streak,
            };
            self.stats.rounds_run += 1;

            // Single acquire-or-reuse point; a dead held connection is let go.
            let reuse = match self.held.take() {
                Some(lease) if lease.is_live() => Some(lease),
                Some(dead) => {
                    tracing::debug!(
                        round = index,
                        "held connection is dead, acquiring a new one"
                    );
                    self.release(dead, index).await;
                    None
                }
                None => None,
            };
            let mut lease = match reuse {
                Some(lease) => lease,
                None => match pool.acquire().await {
                    Ok(conn) => {
                        self.stats.acquisitions += 1;
                        ConnectionLease::new(conn)
                    }
                    Err(e) => match self.on_acquire_failure(e, &round).await {
                        AcquireFlow::NextRound => continue,
                        AcquireFlow::Stop(outcome) => return outcome,
                    },
                },
            };

            let outcome = WorkUnit {
                probe: &self.probe,
                policy: &self.policy,
                attempts: self.limits.attempts,
                out: &mut *self.out,
            }
            .run(lease.conn(), &round)
            .await;
            round.productive = outcome.is_productive();
            self.stats.attempts += outcome.attempts;
            self.stats.probes += outcome.completed;

            // Release on every path; a failed close never changes the verdict.
            self.release(lease, index).await;

            if round.productive {
                self.stats.productive_rounds += 1;
                self.failure_streak = 0;
            } else {
                self.failure_streak += 1;
                tracing::debug!(
                    round = index,
                    streak = self.failure_streak,
                    "round unproductive after {} attempt(s), {} probe(s)",
                    outcome.attempts,
                    outcome.completed
                );
            }
        }

        LoopOutcome::Completed(self.stats)
    }

    async fn release(&mut self, lease: ConnectionLease<P::Conn>, round: u32) {
        if let Err(e) = lease.release().await {
            self.stats.release_failures += 1;
            tracing::warn!(round, "closing connection failed: {}", e);
            tokio::time::sleep(self.policy.release_recovery()).await;
        }
    }

    async fn on_acquire_failure(&mut self, e: DbError, round: &RoundState) -> AcquireFlow {
        self.stats.acquire_failures += 1;
        let category = classify(&e);
        if category == ErrorCategory::PoolExhausted {
            tracing::error!("error opening connection from pool: {}", e);
            return AcquireFlow::Stop(LoopOutcome::Fatal {
                error: e,
                stats: self.stats,
            });
        }

        tracing::warn!(
            round = round.index,
            %category,
            "acquiring connection failed: {}",
            e
        );
        tokio::time::sleep(self.policy.acquire_recovery()).await;

        // Any non-fatal acquisition failure is handled as a lost connection.
        match self
            .policy
            .delay_for(ErrorCategory::ConnectionLost, self.failure_streak)
        {
            RetryDecision::NoRetry => {
                tracing::error!(
                    round = round.index,
                    "breaking operation due to excessive connection errors"
                );
                AcquireFlow::Stop(LoopOutcome::FailedFast(self.stats))
            }
            RetryDecision::RetryAfter(d) => {
                self.failure_streak += 1;
                tokio::time::sleep(d).await;
                AcquireFlow::NextRound
            }
        }
    }
}
