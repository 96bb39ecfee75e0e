//! Accepted-change query over the half-open window `[start, end)`.
//!
//! Returns every accepted, non-empty row in the window; picking the
//! latest row per xref is the aggregator's job.

use chrono::NaiveDateTime;

use treemail_core::error::{Result, TreemailError};
use treemail_core::traits::{ChangeLogStore, ChangeRow};
use treemail_core::types::Tree;

use crate::db::{SQL_DATETIME, TreemailDb};

impl ChangeLogStore for TreemailDb {
    fn query_accepted(
        &self,
        tree: &Tree,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<ChangeRow>> {
        let mut stmt = self
            .conn()
            .prepare(
                "SELECT c.xref, c.change_id, c.change_time,
                        COALESCE(u.user_name, ''), c.new_gedcom
                 FROM change c
                 LEFT JOIN user u ON u.user_id = c.user_id
                 WHERE c.gedcom_id = ?1
                   AND c.status = 'accepted'
                   AND c.new_gedcom <> ''
                   AND c.change_time >= ?2
                   AND c.change_time < ?3
                 ORDER BY c.change_id",
            )
            .map_err(|e| TreemailError::Store(format!("Change query: {e}")))?;

        let rows = stmt
            .query_map(
                rusqlite::params![
                    tree.id,
                    start.format(SQL_DATETIME).to_string(),
                    end.format(SQL_DATETIME).to_string(),
                ],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .map_err(|e| TreemailError::Store(format!("Change query: {e}")))?;

        let mut out = Vec::new();
        for row in rows {
            let (xref, change_id, time_str, actor, payload) =
                row.map_err(|e| TreemailError::Store(format!("Change row: {e}")))?;
            match NaiveDateTime::parse_from_str(&time_str, SQL_DATETIME) {
                Ok(timestamp) => out.push(ChangeRow {
                    xref,
                    change_id,
                    timestamp,
                    actor,
                    payload,
                }),
                Err(e) => {
                    tracing::warn!(change_id, "Skipping change with bad timestamp: {e}");
                }
            }
        }
        Ok(out)
    }
}
