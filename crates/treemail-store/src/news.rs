//! Announcement query over the same window as the change log.

use chrono::NaiveDateTime;

use treemail_core::error::{Result, TreemailError};
use treemail_core::traits::{NewsRow, NewsStore};
use treemail_core::types::Tree;

use crate::db::{SQL_DATETIME, TreemailDb};

impl NewsStore for TreemailDb {
    fn query(
        &self,
        tree: &Tree,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<NewsRow>> {
        let mut stmt = self
            .conn()
            .prepare(
                "SELECT news_id, updated, subject, body
                 FROM news
                 WHERE gedcom_id = ?1
                   AND updated >= ?2
                   AND updated < ?3
                 ORDER BY updated, news_id",
            )
            .map_err(|e| TreemailError::Store(format!("News query: {e}")))?;

        let rows = stmt
            .query_map(
                rusqlite::params![
                    tree.id,
                    start.format(SQL_DATETIME).to_string(),
                    end.format(SQL_DATETIME).to_string(),
                ],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .map_err(|e| TreemailError::Store(format!("News query: {e}")))?;

        let mut out = Vec::new();
        for row in rows {
            let (id, time_str, subject, body) =
                row.map_err(|e| TreemailError::Store(format!("News row: {e}")))?;
            match NaiveDateTime::parse_from_str(&time_str, SQL_DATETIME) {
                Ok(timestamp) => out.push(NewsRow {
                    id,
                    timestamp,
                    subject,
                    body,
                }),
                Err(e) => {
                    tracing::warn!(id, "Skipping announcement with bad timestamp: {e}");
                }
            }
        }
        Ok(out)
    }
}
