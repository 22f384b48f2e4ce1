//! `dbprobe init-table` – schema bootstrap only.

use anyhow::{Context, Result};
use dbprobe_core::config::{Backend, HarnessConfig};
use dbprobe_core::db::mysql::MySqlProbePool;
use dbprobe_core::db::sqlite::SqliteProbePool;
use dbprobe_core::db::{ConnectionPool, TableStatus};
use dbprobe_core::harness::bootstrap;

async fn init_with<P: ConnectionPool>(pool: &P, table: &str) -> Result<()> {
    let (lease, status) = bootstrap(pool, table)
        .await
        .with_context(|| format!("opening connection from pool '{}'", pool.name()))?;
    if let Err(e) = lease.release().await {
        tracing::warn!("closing bootstrap connection failed: {}", e);
    }
    match status {
        Some(TableStatus::Created) => println!("Creating table `{}`: success!", table),
        Some(TableStatus::AlreadyExists) => println!("Creating table `{}`: already exists.", table),
        None => anyhow::bail!("could not create table `{}`", table),
    }
    Ok(())
}

pub async fn run_init_table(cfg: &HarnessConfig) -> Result<()> {
    let table = cfg.database.table.as_str();
    match cfg.database.backend {
        Backend::Mysql => init_with(&MySqlProbePool::new(&cfg.database, &cfg.pool), table).await,
        Backend::Sqlite => {
            let path = cfg
                .database
                .sqlite_path
                .as_deref()
                .context("sqlite backend needs database.sqlite_path")?;
            init_with(&SqliteProbePool::new(path, &cfg.pool), table).await
        }
    }
}
