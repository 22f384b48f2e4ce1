//! SQLite adapter, for local runs without a server.

use super::connection::{acquire_from, SqlxProbeConnection};
use super::{ConnectionPool, Dialect};
use crate::config::PoolConfig;
use crate::retry::DbError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::time::Duration;

/// Connection borrowed from a [`SqliteProbePool`].
pub type SqliteProbeConnection = SqlxProbeConnection<Sqlite>;

/// Pool over one SQLite database file, created on first use.
pub struct SqliteProbePool {
    pool: Pool<Sqlite>,
    name: String,
    capacity: u32,
}

impl SqliteProbePool {
    pub fn new(path: &Path, cfg: &PoolConfig) -> Self {
        let opts = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(cfg.size)
            .acquire_timeout(Duration::from_secs(cfg.acquire_timeout_secs))
            .test_before_acquire(cfg.auto_reconnect)
            .connect_lazy_with(opts);
        tracing::debug!(
            "sqlite pool '{}' at {} (size {})",
            cfg.name,
            path.display(),
            cfg.size
        );
        Self {
            pool,
            name: cfg.name.clone(),
            capacity: cfg.size,
        }
    }
}

impl ConnectionPool for SqliteProbePool {
    type Conn = SqliteProbeConnection;

    fn name(&self) -> &str {
        &self.name
    }

    fn capacity(&self) -> u32 {
        self.capacity
    }

    async fn acquire(&self) -> Result<SqliteProbeConnection, DbError> {
        acquire_from(&self.pool, self.capacity, Dialect::Sqlite).await
    }
}
