//! Harness entry point: schema bootstrap, then the round loop.

use crate::config::HarnessConfig;
use crate::db::{ConnectionLease, ConnectionPool, ProbeConnection, TableStatus};
use crate::probe::ProbeOperation;
use crate::retry::{classify, BackoffPolicy, DbError, ErrorCategory};
use crate::round_loop::{LoopOutcome, LoopStats, RoundLoop};
use std::io::Write;

/// Final line of primary output on a non-fatal run.
pub const DONE_NOTICE: &str = "Job done.";

/// Borrow a connection and make sure the probe table exists.
///
/// A failure to create the table is logged, not returned; only a failed
/// acquisition is an error. The lease is handed back for reuse.
pub async fn bootstrap<P: ConnectionPool>(
    pool: &P,
    table: &str,
) -> Result<(ConnectionLease<P::Conn>, Option<TableStatus>), DbError> {
    let mut lease = ConnectionLease::new(pool.acquire().await?);
    let status = match lease.conn().create_table(table).await {
        Ok(status) => {
            match status {
                TableStatus::Created => tracing::info!("created table `{}`", table),
                TableStatus::AlreadyExists => tracing::info!("table `{}` already exists", table),
            }
            Some(status)
        }
        Err(e) => {
            tracing::warn!("creating table `{}` failed: {}", table, e);
            None
        }
    };
    Ok((lease, status))
}

/// Run the whole harness and print the completion notice unless the run
/// ended fatally.
pub async fn run_harness<P, W>(pool: &P, cfg: &HarnessConfig, out: &mut W) -> LoopOutcome
where
    P: ConnectionPool,
    W: Write,
{
    let table = cfg.database.table.as_str();
    // A failed bootstrap acquisition is the first link of the failure streak.
    let (held, streak) = match bootstrap(pool, table).await {
        Ok((lease, _)) => (Some(lease), 0),
        Err(e) if classify(&e) == ErrorCategory::PoolExhausted => {
            tracing::error!("error opening connection from pool: {}", e);
            return LoopOutcome::Fatal {
                error: e,
                stats: LoopStats::default(),
            };
        }
        Err(e) => {
            tracing::warn!("bootstrap connection failed, table not checked: {}", e);
            (None, 1)
        }
    };

    let mut rounds = RoundLoop::new(
        pool,
        ProbeOperation::new(table),
        BackoffPolicy::from(&cfg.backoff),
        cfg.probe,
        out,
    )
    .with_failure_streak(streak);
    if let Some(lease) = held {
        rounds = rounds.with_connection(lease);
    }
    let outcome = rounds.run().await;

    let stats = outcome.stats();
    tracing::info!(
        "{} round(s), {} productive, {} probe(s) confirmed",
        stats.rounds_run,
        stats.productive_rounds,
        stats.probes
    );
    if !outcome.is_fatal() {
        if let Err(e) = writeln!(out, "{}", DONE_NOTICE) {
            tracing::warn!("could not write completion notice: {}", e);
        }
    }
    outcome
}
