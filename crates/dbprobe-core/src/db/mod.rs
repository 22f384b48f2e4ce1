//! Narrow capability interface over the pooled database client.
//!
//! The policy layer only ever sees `ConnectionPool` and `ProbeConnection`;
//! the sqlx-backed adapters in `mysql` and `sqlite` realise them. Pool
//! internals (slot management, physical reconnection) stay in sqlx.

#![allow(async_fn_in_trait)]

mod connection;
mod driver;
mod lease;
pub mod mysql;
pub mod sqlite;

pub use connection::SqlxProbeConnection;
pub use lease::ConnectionLease;

use crate::retry::DbError;
use chrono::NaiveDateTime;

/// Format of the client-side timestamp written by each probe.
pub const DATESTR_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Format of the store-side creation time when a record is confirmed.
pub const CREATED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A row of the probe table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRecord {
    /// Assigned by the store; increases with every insert.
    pub id: i64,
    /// Client timestamp written by the probe.
    pub datestr: String,
    /// Assigned by the store at insert time.
    pub created_at: NaiveDateTime,
}

impl ProbeRecord {
    /// One-line confirmation: `id, datestr, created_at` (whole seconds).
    pub fn confirmation(&self) -> String {
        format!(
            "{}, {}, {}",
            self.id,
            self.datestr,
            self.created_at.format(CREATED_AT_FORMAT)
        )
    }
}

/// Result of the schema bootstrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableStatus {
    Created,
    AlreadyExists,
}

/// A pool of reusable connections.
pub trait ConnectionPool {
    type Conn: ProbeConnection;

    fn name(&self) -> &str;

    fn capacity(&self) -> u32;

    /// Borrow one connection. Fails with `DbError::Pool` when none can be
    /// obtained, or with the error that prevented connecting.
    async fn acquire(&self) -> Result<Self::Conn, DbError>;
}

/// A borrowed connection.
pub trait ProbeConnection {
    /// Create the probe table; an existing table is not an error.
    async fn create_table(&mut self, table: &str) -> Result<TableStatus, DbError>;

    /// Insert one probe row inside a new transaction.
    async fn insert_probe(&mut self, table: &str, datestr: &str) -> Result<(), DbError>;

    /// Commit the open transaction.
    async fn commit(&mut self) -> Result<(), DbError>;

    /// Most recent row by descending id.
    async fn latest_probe(&mut self, table: &str) -> Result<Option<ProbeRecord>, DbError>;

    /// False once the session has been seen to fail at the interface level.
    fn is_live(&self) -> bool;

    /// Give the connection back. Failures are reported but the handle is
    /// gone either way.
    async fn close(self) -> Result<(), DbError>;
}

/// SQL flavour spoken by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Dialect {
    MySql,
    Sqlite,
}

/// DDL for the probe table.
pub(crate) fn create_table_sql(table: &str, dialect: Dialect) -> String {
    match dialect {
        Dialect::Sqlite => format!(
            "CREATE TABLE `{table}` (\
             `id` INTEGER PRIMARY KEY AUTOINCREMENT, \
             `datestr` VARCHAR(30) NOT NULL, \
             `created_at` TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP)"
        ),
        Dialect::MySql => format!(
            "CREATE TABLE `{table}` (\
             `id` int(11) NOT NULL AUTO_INCREMENT, \
             `datestr` varchar(30) NOT NULL, \
             `created_at` timestamp NOT NULL DEFAULT current_timestamp(), \
             PRIMARY KEY (`id`), \
             KEY `datestr` (`datestr`)) ENGINE=InnoDB"
        ),
    }
}

pub(crate) fn insert_sql(table: &str) -> String {
    format!("INSERT INTO `{table}` (datestr) VALUES (?)")
}

pub(crate) fn latest_sql(table: &str) -> String {
    format!("SELECT id, datestr, created_at FROM `{table}` ORDER BY id DESC LIMIT 1")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn confirmation_truncates_created_at_to_seconds() {
        let created_at = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_micro_opt(14, 5, 7, 250_000)
            .unwrap();
        let rec = ProbeRecord {
            id: 42,
            datestr: "2024-03-09 14:05:07.123456".to_string(),
            created_at,
        };
        assert_eq!(
            rec.confirmation(),
            "42, 2024-03-09 14:05:07.123456, 2024-03-09 14:05:07"
        );
    }

    #[test]
    fn statements_quote_table() {
        assert!(insert_sql("test1").contains("`test1`"));
        assert!(latest_sql("test1").ends_with("ORDER BY id DESC LIMIT 1"));
        assert!(create_table_sql("t", Dialect::MySql).contains("AUTO_INCREMENT"));
        assert!(create_table_sql("t", Dialect::Sqlite).contains("AUTOINCREMENT"));
    }
}
