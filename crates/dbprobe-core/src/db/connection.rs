//! `ProbeConnection` over any sqlx pool connection.
//!
//! The MySQL and SQLite adapters only differ in how they build their pool;
//! the borrowed connection and its transaction handling live here.

use super::driver::{is_table_exists, pool_timeout, Session};
use super::{
    create_table_sql, insert_sql, latest_sql, Dialect, ProbeConnection, ProbeRecord, TableStatus,
};
use crate::retry::DbError;
use chrono::NaiveDateTime;
use sqlx::pool::PoolConnection;
use sqlx::{ColumnIndex, Database, Decode, Encode, Executor, IntoArguments, Pool, Row, Type};

/// A connection borrowed from an sqlx pool.
pub struct SqlxProbeConnection<DB: Database> {
    conn: PoolConnection<DB>,
    dialect: Dialect,
    session: Session,
}

/// Borrow from `pool`, which holds at most `capacity` connections.
pub(crate) async fn acquire_from<DB: Database>(
    pool: &Pool<DB>,
    capacity: u32,
    dialect: Dialect,
) -> Result<SqlxProbeConnection<DB>, DbError> {
    match pool.acquire().await {
        Ok(conn) => Ok(SqlxProbeConnection {
            conn,
            dialect,
            session: Session::new(),
        }),
        // sqlx keeps retrying refused connects until the deadline and then
        // reports the same timeout as a full pool.
        Err(sqlx::Error::PoolTimedOut) => Err(pool_timeout(pool.size(), pool.num_idle(), capacity)),
        Err(e) => Err(e.into()),
    }
}

impl<DB> ProbeConnection for SqlxProbeConnection<DB>
where
    DB: Database,
    for<'c> &'c mut DB::Connection: Executor<'c, Database = DB>,
    for<'q> DB::Arguments<'q>: IntoArguments<'q, DB>,
    String: for<'q> Encode<'q, DB> + for<'r> Decode<'r, DB> + Type<DB>,
    i64: for<'r> Decode<'r, DB> + Type<DB>,
    NaiveDateTime: for<'r> Decode<'r, DB> + Type<DB>,
    &'static str: ColumnIndex<DB::Row>,
{
    async fn create_table(&mut self, table: &str) -> Result<TableStatus, DbError> {
        let ddl = create_table_sql(table, self.dialect);
        match (&mut *self.conn).execute(ddl.as_str()).await {
            Ok(_) => Ok(TableStatus::Created),
            Err(e) if is_table_exists(&e) => Ok(TableStatus::AlreadyExists),
            Err(e) => Err(self.session.observe(e)),
        }
    }

    async fn insert_probe(&mut self, table: &str, datestr: &str) -> Result<(), DbError> {
        if !self.session.in_tx {
            (&mut *self.conn)
                .execute("BEGIN")
                .await
                .map_err(|e| self.session.observe(e))?;
            self.session.in_tx = true;
        }
        sqlx::query::<DB>(&insert_sql(table))
            .bind(datestr.to_string())
            .execute(&mut *self.conn)
            .await
            .map_err(|e| self.session.observe(e))?;
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), DbError> {
        (&mut *self.conn)
            .execute("COMMIT")
            .await
            .map_err(|e| self.session.observe(e))?;
        self.session.in_tx = false;
        Ok(())
    }

    async fn latest_probe(&mut self, table: &str) -> Result<Option<ProbeRecord>, DbError> {
        let row = sqlx::query::<DB>(&latest_sql(table))
            .fetch_optional(&mut *self.conn)
            .await
            .map_err(|e| self.session.observe(e))?;
        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(ProbeRecord {
            id: row.try_get("id")?,
            datestr: row.try_get("datestr")?,
            created_at: row.try_get("created_at")?,
        }))
    }

    fn is_live(&self) -> bool {
        self.session.live
    }

    async fn close(mut self) -> Result<(), DbError> {
        let mut result = Ok(());
        if self.session.live && self.session.in_tx {
            match (&mut *self.conn).execute("ROLLBACK").await {
                Ok(_) => self.session.in_tx = false,
                Err(e) => result = Err(self.session.observe(e)),
            }
        }
        if self.session.must_discard() {
            // Drop the physical connection; the pool opens a fresh one later.
            self.conn.close().await?;
        }
        result
    }
}
