//! `dbprobe run` – drive the probe rounds against the configured backend.

use anyhow::{Context, Result};
use dbprobe_core::config::{Backend, HarnessConfig};
use dbprobe_core::db::mysql::MySqlProbePool;
use dbprobe_core::db::sqlite::SqliteProbePool;
use dbprobe_core::harness::run_harness;

/// Returns the exit code: 1 if the pool was exhausted, 0 otherwise.
pub async fn run_probe(cfg: &HarnessConfig) -> Result<i32> {
    let mut out = std::io::stdout();
    let outcome = match cfg.database.backend {
        Backend::Mysql => {
            let pool = MySqlProbePool::new(&cfg.database, &cfg.pool);
            run_harness(&pool, cfg, &mut out).await
        }
        Backend::Sqlite => {
            let path = cfg
                .database
                .sqlite_path
                .as_deref()
                .context("sqlite backend needs database.sqlite_path")?;
            let pool = SqliteProbePool::new(path, &cfg.pool);
            run_harness(&pool, cfg, &mut out).await
        }
    };
    Ok(outcome.exit_code())
}
