//! Database handle and schema migration.

use rusqlite::Connection;
use std::path::Path;

use treemail_core::error::{Result, TreemailError};

/// Timestamp format used in TEXT columns. Lexicographic order matches
/// chronological order, so range predicates work on strings.
pub(crate) const SQL_DATETIME: &str = "%Y-%m-%d %H:%M:%S";

/// SQLite-backed store. Implements every collaborator trait.
pub struct TreemailDb {
    conn: Connection,
    /// Base URL used when building record and image links.
    base_url: String,
}

impl TreemailDb {
    /// Open or create the database at `path`.
    pub fn open(path: &Path, base_url: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .map_err(|e| TreemailError::Store(format!("DB open: {e}")))?;
        let db = Self {
            conn,
            base_url: base_url.trim_end_matches('/').to_string(),
        };
        db.migrate()?;
        Ok(db)
    }

    /// In-memory database, used by tests and fixtures.
    pub fn open_in_memory(base_url: &str) -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| TreemailError::Store(format!("DB open: {e}")))?;
        let db = Self {
            conn,
            base_url: base_url.trim_end_matches('/').to_string(),
        };
        db.migrate()?;
        Ok(db)
    }

    /// Run migrations to create tables.
    fn migrate(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "
            -- Trees (isolated genealogical datasets)
            CREATE TABLE IF NOT EXISTS gedcom (
                gedcom_id   INTEGER PRIMARY KEY,
                gedcom_name TEXT NOT NULL UNIQUE,
                title       TEXT NOT NULL DEFAULT ''
            );

            -- Registered users (digest recipients)
            CREATE TABLE IF NOT EXISTS user (
                user_id   INTEGER PRIMARY KEY,
                user_name TEXT NOT NULL UNIQUE,
                real_name TEXT NOT NULL DEFAULT '',
                email     TEXT NOT NULL,
                language  TEXT NOT NULL DEFAULT 'en'
            );

            -- Per-tree membership roles ('member' or 'manager')
            CREATE TABLE IF NOT EXISTS tree_access (
                gedcom_id INTEGER NOT NULL,
                user_id   INTEGER NOT NULL,
                role      TEXT NOT NULL DEFAULT 'member',
                PRIMARY KEY (gedcom_id, user_id)
            );

            -- Site-wide key/value state (last digest date lives here)
            CREATE TABLE IF NOT EXISTS site_setting (
                setting_name  TEXT PRIMARY KEY,
                setting_value TEXT NOT NULL
            );

            -- Change log: one row per edit, accepted or pending
            CREATE TABLE IF NOT EXISTS change (
                change_id   INTEGER PRIMARY KEY AUTOINCREMENT,
                gedcom_id   INTEGER NOT NULL,
                xref        TEXT NOT NULL,
                status      TEXT NOT NULL DEFAULT 'accepted',
                change_time TEXT NOT NULL,
                user_id     INTEGER,
                new_gedcom  TEXT NOT NULL DEFAULT ''
            );
            CREATE INDEX IF NOT EXISTS ix_change_window
                ON change (gedcom_id, change_time);

            -- Tree announcements
            CREATE TABLE IF NOT EXISTS news (
                news_id   INTEGER PRIMARY KEY AUTOINCREMENT,
                gedcom_id INTEGER NOT NULL,
                subject   TEXT NOT NULL,
                body      TEXT NOT NULL DEFAULT '',
                updated   TEXT NOT NULL
            );

            -- Current records, one row per xref
            CREATE TABLE IF NOT EXISTS record (
                gedcom_id     INTEGER NOT NULL,
                xref          TEXT NOT NULL,
                tag           TEXT NOT NULL,            -- INDI, FAM, OBJE, ...
                full_name     TEXT NOT NULL,
                restriction   TEXT NOT NULL DEFAULT 'public',
                deceased      INTEGER NOT NULL DEFAULT 0,
                portrait_path TEXT,
                portrait_mime TEXT,
                PRIMARY KEY (gedcom_id, xref)
            );

            -- Spouse links for family records
            CREATE TABLE IF NOT EXISTS family_spouse (
                gedcom_id   INTEGER NOT NULL,
                fam_xref    TEXT NOT NULL,
                spouse_xref TEXT NOT NULL,
                ord         INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (gedcom_id, fam_xref, spouse_xref)
            );

            -- Recurring date facts; md = month * 32 + day
            CREATE TABLE IF NOT EXISTS dates (
                gedcom_id INTEGER NOT NULL,
                xref      TEXT NOT NULL,
                fact      TEXT NOT NULL,                -- BIRT, DEAT, MARR
                year      INTEGER NOT NULL,
                month     INTEGER NOT NULL,
                day       INTEGER NOT NULL,
                md        INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS ix_dates_md
                ON dates (gedcom_id, md);
         ",
            )
            .map_err(|e| TreemailError::Store(format!("Migration: {e}")))?;
        Ok(())
    }

    /// Raw connection, for admin tooling and test fixtures.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_and_migrate_in_memory() {
        let db = TreemailDb::open_in_memory("http://example.org/").unwrap();
        // Trailing slash is trimmed once at open.
        assert_eq!(db.base_url(), "http://example.org");
        // Migration is idempotent.
        db.migrate().unwrap();
    }

    #[test]
    fn open_on_disk() {
        let dir = std::env::temp_dir().join("treemail-db-test");
        std::fs::create_dir_all(&dir).ok();
        let path = dir.join("test.db");
        let db = TreemailDb::open(&path, "http://example.org").unwrap();
        db.conn()
            .execute(
                "INSERT INTO gedcom (gedcom_name, title) VALUES ('demo', 'Demo')",
                [],
            )
            .unwrap();
        drop(db);
        std::fs::remove_dir_all(&dir).ok();
    }
}
