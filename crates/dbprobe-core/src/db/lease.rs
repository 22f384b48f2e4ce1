//! Scoped ownership of one borrowed connection.

use super::ProbeConnection;
use crate::retry::DbError;

/// Owns a borrowed connection until `release` gives it back.
///
/// `release` consumes the lease, so a released connection cannot be used
/// again. A lease dropped without `release` (a panic, a cancelled future)
/// still returns the handle, skipping the close protocol.
pub struct ConnectionLease<C: ProbeConnection> {
    conn: Option<C>,
}

impl<C: ProbeConnection> ConnectionLease<C> {
    pub fn new(conn: C) -> Self {
        Self { conn: Some(conn) }
    }

    /// The leased connection.
    pub fn conn(&mut self) -> &mut C {
        // Only `release` (which consumes self) and `drop` take the connection.
        match self.conn.as_mut() {
            Some(conn) => conn,
            None => unreachable!("lease used after release"),
        }
    }

    pub fn is_live(&self) -> bool {
        self.conn.as_ref().is_some_and(|c| c.is_live())
    }

    /// Close the connection exactly once.
    pub async fn release(mut self) -> Result<(), DbError> {
        match self.conn.take() {
            Some(conn) => conn.close().await,
            None => Ok(()),
        }
    }
}

impl<C: ProbeConnection> Drop for ConnectionLease<C> {
    fn drop(&mut self) {
        if self.conn.take().is_some() {
            tracing::warn!("connection lease dropped without release");
        }
    }
}
