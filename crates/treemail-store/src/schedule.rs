//! Persisted schedule state: the date of the last completed run.

use chrono::NaiveDate;
use rusqlite::OptionalExtension;

use treemail_core::error::{Result, TreemailError};
use treemail_core::traits::ScheduleStore;

use crate::db::TreemailDb;

const LAST_SEND_KEY: &str = "DIGEST_LAST_SEND";

impl ScheduleStore for TreemailDb {
    fn last_send(&self) -> Option<NaiveDate> {
        let value: String = self
            .conn()
            .query_row(
                "SELECT setting_value FROM site_setting WHERE setting_name = ?1",
                [LAST_SEND_KEY],
                |row| row.get(0),
            )
            .optional()
            .unwrap_or_default()?;

        match NaiveDate::parse_from_str(&value, "%Y-%m-%d") {
            Ok(date) => Some(date),
            Err(e) => {
                // Unparsable state reads as "never sent".
                tracing::warn!("Ignoring unparsable last-send date '{value}': {e}");
                None
            }
        }
    }

    fn record_send(&self, date: NaiveDate) -> Result<()> {
        self.conn()
            .execute(
                "INSERT OR REPLACE INTO site_setting (setting_name, setting_value)
                 VALUES (?1, ?2)",
                rusqlite::params![LAST_SEND_KEY, date.format("%Y-%m-%d").to_string()],
            )
            .map_err(|e| TreemailError::Store(format!("Record send: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_reads_as_none() {
        let db = TreemailDb::open_in_memory("http://example").unwrap();
        assert_eq!(db.last_send(), None);
    }

    #[test]
    fn record_and_read_back() {
        let db = TreemailDb::open_in_memory("http://example").unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 1, 8).unwrap();
        db.record_send(date).unwrap();
        assert_eq!(db.last_send(), Some(date));

        // Overwrites, never accumulates.
        let later = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        db.record_send(later).unwrap();
        assert_eq!(db.last_send(), Some(later));
        let rows: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM site_setting", [], |r| r.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn garbage_value_reads_as_never_sent() {
        let db = TreemailDb::open_in_memory("http://example").unwrap();
        db.conn()
            .execute(
                "INSERT INTO site_setting (setting_name, setting_value)
                 VALUES ('DIGEST_LAST_SEND', 'not-a-date')",
                [],
            )
            .unwrap();
        assert_eq!(db.last_send(), None);
    }
}
