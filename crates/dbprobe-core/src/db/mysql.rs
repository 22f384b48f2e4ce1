//! MySQL/MariaDB adapter.

use super::connection::{acquire_from, SqlxProbeConnection};
use super::{ConnectionPool, Dialect};
use crate::config::{DatabaseConfig, PoolConfig};
use crate::retry::DbError;
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};
use sqlx::{MySql, Pool};
use std::time::Duration;

/// Connection borrowed from a [`MySqlProbePool`].
pub type MySqlProbeConnection = SqlxProbeConnection<MySql>;

/// Lazily connected MySQL pool. Nothing touches the network until the
/// first `acquire`.
pub struct MySqlProbePool {
    pool: Pool<MySql>,
    name: String,
    capacity: u32,
}

impl MySqlProbePool {
    pub fn new(db: &DatabaseConfig, cfg: &PoolConfig) -> Self {
        let opts = MySqlConnectOptions::new()
            .host(&db.host)
            .port(db.port)
            .username(&db.user)
            .password(&db.password)
            .database(&db.name);
        let pool = MySqlPoolOptions::new()
            .max_connections(cfg.size)
            .acquire_timeout(Duration::from_secs(cfg.acquire_timeout_secs))
            .test_before_acquire(cfg.auto_reconnect)
            .connect_lazy_with(opts);
        tracing::debug!(
            "mysql pool '{}' for {}:{}/{} (size {})",
            cfg.name,
            db.host,
            db.port,
            db.name,
            cfg.size
        );
        Self {
            pool,
            name: cfg.name.clone(),
            capacity: cfg.size,
        }
    }
}

impl ConnectionPool for MySqlProbePool {
    type Conn = MySqlProbeConnection;

    fn name(&self) -> &str {
        &self.name
    }

    fn capacity(&self) -> u32 {
        self.capacity
    }

    async fn acquire(&self) -> Result<MySqlProbeConnection, DbError> {
        acquire_from(&self.pool, self.capacity, Dialect::MySql).await
    }
}
