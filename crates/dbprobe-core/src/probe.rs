//! One write-then-read probe against a borrowed connection.

use crate::db::{ProbeConnection, ProbeRecord, DATESTR_FORMAT};
use crate::retry::{BackoffPolicy, DbError, Pacing, ProbeFailure, ProbePhase};
use chrono::Local;

/// Writes a timestamped record, commits it, and reads back the newest row.
#[derive(Debug, Clone)]
pub struct ProbeOperation {
    table: String,
}

impl ProbeOperation {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Run one probe. The read phase only starts once the insert is
    /// committed; a failed write never reaches commit.
    pub async fn write_then_read<C: ProbeConnection>(
        &self,
        conn: &mut C,
        policy: &BackoffPolicy,
    ) -> Result<ProbeRecord, ProbeFailure> {
        let datestr = Local::now().format(DATESTR_FORMAT).to_string();

        conn.insert_probe(&self.table, &datestr)
            .await
            .map_err(|e| ProbeFailure::new(ProbePhase::Write, e))?;
        conn.commit()
            .await
            .map_err(|e| ProbeFailure::new(ProbePhase::Commit, e))?;

        tokio::time::sleep(policy.pacing(Pacing::InsertToRead)).await;

        let record = conn
            .latest_probe(&self.table)
            .await
            .map_err(|e| ProbeFailure::new(ProbePhase::Read, e))?
            .ok_or_else(|| {
                ProbeFailure::new(
                    ProbePhase::Read,
                    DbError::Other(format!("no rows in `{}` after commit", self.table)),
                )
            })?;

        if record.datestr != datestr {
            // Another writer got in between; the probe still went through.
            tracing::warn!(
                "newest row {} carries {:?}, expected {:?}",
                record.id,
                record.datestr,
                datestr
            );
        }
        Ok(record)
    }
}
