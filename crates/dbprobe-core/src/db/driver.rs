//! Interpret sqlx errors as `DbError` families.

use crate::retry::DbError;
use sqlx::error::DatabaseError;
use sqlx::mysql::MySqlDatabaseError;

/// MySQL/MariaDB error numbers that mean the session is gone.
const LOST_SESSION_NUMBERS: &[u16] = &[
    1053, // server shutdown in progress
    1152, // aborted connection
    1158, // error reading communication packets
    1159, // timeout reading communication packets
    1160, // error writing communication packets
    1161, // timeout writing communication packets
    1927, // connection was killed
    2006, // server has gone away
    2013, // lost connection during query
];

/// ER_TABLE_EXISTS_ERROR.
const TABLE_EXISTS_NUMBER: u16 = 1050;

/// SQLSTATE class for connection exceptions.
const CONNECTION_SQLSTATE_CLASS: &str = "08";

fn mysql_number(db: &dyn DatabaseError) -> Option<u16> {
    db.try_downcast_ref::<MySqlDatabaseError>().map(|e| e.number())
}

/// Whether a server error means the session itself is gone.
pub(crate) fn is_lost_session(number: Option<u16>, sqlstate: Option<&str>) -> bool {
    number.is_some_and(|n| LOST_SESSION_NUMBERS.contains(&n))
        || sqlstate.is_some_and(|s| s.starts_with(CONNECTION_SQLSTATE_CLASS))
}

/// Whether a server error means the table is already there. SQLite has no
/// number for it and only says so in the message.
pub(crate) fn is_table_exists_error(number: Option<u16>, message: &str) -> bool {
    number == Some(TABLE_EXISTS_NUMBER) || message.contains("already exists")
}

/// Interpret `PoolTimedOut` from a pool with `size` open connections,
/// `idle` of them free, and room for `capacity`. Only a pool with every
/// slot checked out is exhausted; otherwise opening a connection kept
/// failing until the deadline.
pub(crate) fn pool_timeout(size: u32, idle: usize, capacity: u32) -> DbError {
    if size >= capacity && idle == 0 {
        DbError::Pool("timed out waiting for a free connection".to_string())
    } else {
        DbError::Interface("timed out connecting to the database".to_string())
    }
}

impl From<sqlx::Error> for DbError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            // Without pool occupancy this can only be read as exhaustion;
            // the adapters refine it through `pool_timeout`.
            sqlx::Error::PoolTimedOut => {
                DbError::Pool("timed out waiting for a free connection".to_string())
            }
            sqlx::Error::PoolClosed => DbError::Pool("pool is closed".to_string()),
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Protocol(_)
            | sqlx::Error::WorkerCrashed => DbError::Interface(e.to_string()),
            sqlx::Error::Database(ref db) => {
                let number = mysql_number(&**db);
                let sqlstate = db.code().map(|c| c.into_owned());
                let message = db.message().to_string();
                if is_lost_session(number, sqlstate.as_deref()) {
                    return DbError::Interface(message);
                }
                DbError::Operational {
                    code: number.map(|n| n.to_string()).or(sqlstate),
                    message,
                }
            }
            other => DbError::Other(other.to_string()),
        }
    }
}

/// True if the error means the table is already there.
pub(crate) fn is_table_exists(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db) => is_table_exists_error(mysql_number(&**db), db.message()),
        _ => false,
    }
}

/// Liveness and transaction bookkeeping shared by the sqlx adapters.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Session {
    pub(crate) live: bool,
    pub(crate) in_tx: bool,
}

impl Session {
    pub(crate) fn new() -> Self {
        Self {
            live: true,
            in_tx: false,
        }
    }

    /// Convert a driver error, marking the session dead on interface failures.
    pub(crate) fn observe(&mut self, e: sqlx::Error) -> DbError {
        let e = DbError::from(e);
        if matches!(e, DbError::Interface(_)) {
            self.live = false;
        }
        e
    }

    /// Whether `close` must drop the physical connection instead of pooling it.
    pub(crate) fn must_discard(&self) -> bool {
        !self.live || self.in_tx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::{classify, ErrorCategory};

    #[test]
    fn pool_errors_are_exhaustion() {
        assert_eq!(
            classify(&sqlx::Error::PoolTimedOut.into()),
            ErrorCategory::PoolExhausted
        );
        assert_eq!(
            classify(&sqlx::Error::PoolClosed.into()),
            ErrorCategory::PoolExhausted
        );
    }

    #[test]
    fn transport_errors_are_connection_lost() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");
        assert_eq!(
            classify(&sqlx::Error::Io(io).into()),
            ErrorCategory::ConnectionLost
        );
        assert_eq!(
            classify(&sqlx::Error::Protocol("bad packet".into()).into()),
            ErrorCategory::ConnectionLost
        );
        assert_eq!(
            classify(&sqlx::Error::WorkerCrashed.into()),
            ErrorCategory::ConnectionLost
        );
    }

    #[test]
    fn session_dies_on_interface_errors_only() {
        let mut session = Session::new();
        let _ = session.observe(sqlx::Error::RowNotFound);
        assert!(session.live);
        let _ = session.observe(sqlx::Error::Protocol("eof".into()));
        assert!(!session.live);
        assert!(session.must_discard());
    }

    #[test]
    fn lost_session_numbers_and_connection_sqlstates() {
        for number in [2006, 2013, 1927, 1053, 1158] {
            assert!(is_lost_session(Some(number), None), "{}", number);
        }
        assert!(is_lost_session(None, Some("08S01")));
        assert!(is_lost_session(Some(1105), Some("08004")));
        // Lock wait timeout, deadlock, duplicate key: the session survives.
        assert!(!is_lost_session(Some(1205), Some("HY000")));
        assert!(!is_lost_session(Some(1213), Some("40001")));
        assert!(!is_lost_session(Some(1062), Some("23000")));
        // SQLite codes are bare integers and never look like class 08.
        assert!(!is_lost_session(None, Some("8")));
        assert!(!is_lost_session(None, None));
    }

    #[test]
    fn table_exists_by_number_or_message() {
        assert!(is_table_exists_error(Some(1050), "Table 'test1' already exists"));
        assert!(is_table_exists_error(None, "table `test1` already exists"));
        assert!(!is_table_exists_error(Some(1146), "Table 'db.test1' doesn't exist"));
        assert!(!is_table_exists(&sqlx::Error::RowNotFound));
    }

    #[test]
    fn timeout_with_free_slots_is_a_failed_connect() {
        // Server down: nothing open, nothing idle.
        assert_eq!(classify(&pool_timeout(0, 0, 5)), ErrorCategory::ConnectionLost);
        // One lease held by the harness, the rest never opened.
        assert_eq!(classify(&pool_timeout(1, 0, 5)), ErrorCategory::ConnectionLost);
        assert_eq!(classify(&pool_timeout(5, 0, 5)), ErrorCategory::PoolExhausted);
        assert_eq!(classify(&pool_timeout(5, 2, 5)), ErrorCategory::ConnectionLost);
    }

    #[test]
    fn everything_else_is_unknown() {
        assert_eq!(
            classify(&sqlx::Error::RowNotFound.into()),
            ErrorCategory::Unknown
        );
    }
}
