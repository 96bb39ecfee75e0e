//! Year-independent calendar query.
//!
//! Date facts are stored with a month-day index (`month * 32 + day`) so
//! one indexed range predicate matches the same span of the year across
//! every historical year. Callers split windows that cross Dec 31 into
//! two ranges before calling here.

use rusqlite::types::Value;

use treemail_core::error::{Result, TreemailError};
use treemail_core::traits::{CalendarRow, CalendarSource};
use treemail_core::types::{EventKind, Tree};

use crate::db::TreemailDb;

impl CalendarSource for TreemailDb {
    fn query_events(
        &self,
        tree: &Tree,
        start_md: u32,
        end_md: u32,
        tags: &[EventKind],
        include_deceased: bool,
    ) -> Result<Vec<CalendarRow>> {
        if tags.is_empty() || start_md >= end_md {
            return Ok(Vec::new());
        }

        // One placeholder per requested fact tag.
        let tag_slots = (0..tags.len())
            .map(|i| format!("?{}", i + 5))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT d.xref, d.fact, d.year, d.month, d.day
             FROM dates d
             JOIN record r ON r.gedcom_id = d.gedcom_id AND r.xref = d.xref
             WHERE d.gedcom_id = ?1
               AND d.md >= ?2 AND d.md < ?3
               AND (?4 OR r.deceased = 0)
               AND d.fact IN ({tag_slots})
             ORDER BY d.md, d.xref"
        );

        let mut params: Vec<Value> = vec![
            Value::Integer(tree.id),
            Value::Integer(i64::from(start_md)),
            Value::Integer(i64::from(end_md)),
            Value::Integer(i64::from(include_deceased)),
        ];
        params.extend(tags.iter().map(|t| Value::Text(t.tag().to_string())));

        let mut stmt = self
            .conn()
            .prepare(&sql)
            .map_err(|e| TreemailError::Store(format!("Calendar query: {e}")))?;
        let rows = stmt
            .query_map(rusqlite::params_from_iter(params), |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i32>(2)?,
                    row.get::<_, u32>(3)?,
                    row.get::<_, u32>(4)?,
                ))
            })
            .map_err(|e| TreemailError::Store(format!("Calendar query: {e}")))?;

        let mut out = Vec::new();
        for row in rows {
            let (xref, fact, year, month, day) =
                row.map_err(|e| TreemailError::Store(format!("Calendar row: {e}")))?;
            // The schema accepts any fact string; unknown ones are not
            // calendar events and are skipped.
            let Some(event) = EventKind::from_tag(&fact) else {
                tracing::warn!(xref, fact, "Skipping unknown calendar fact");
                continue;
            };
            out.push(CalendarRow {
                xref,
                event,
                year,
                month,
                day,
            });
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db_with_tree() -> (TreemailDb, Tree) {
        let db = TreemailDb::open_in_memory("http://example").unwrap();
        db.conn()
            .execute(
                "INSERT INTO gedcom (gedcom_id, gedcom_name, title) VALUES (1, 'demo', 'Demo')",
                [],
            )
            .unwrap();
        (
            db,
            Tree {
                id: 1,
                name: "demo".into(),
                title: "Demo".into(),
            },
        )
    }

    fn insert_person(db: &TreemailDb, xref: &str, deceased: bool) {
        db.conn()
            .execute(
                "INSERT INTO record (gedcom_id, xref, tag, full_name, deceased)
                 VALUES (1, ?1, 'INDI', ?1, ?2)",
                rusqlite::params![xref, deceased as i64],
            )
            .unwrap();
    }

    fn insert_date(db: &TreemailDb, xref: &str, fact: &str, year: i32, month: u32, day: u32) {
        db.conn()
            .execute(
                "INSERT INTO dates (gedcom_id, xref, fact, year, month, day, md)
                 VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![xref, fact, year, month, day, month * 32 + day],
            )
            .unwrap();
    }

    #[test]
    fn range_matches_all_historical_years() {
        let (db, tree) = db_with_tree();
        insert_person(&db, "I1", false);
        insert_person(&db, "I2", false);
        insert_date(&db, "I1", "BIRT", 1950, 3, 10);
        insert_date(&db, "I2", "BIRT", 1982, 3, 12);
        insert_date(&db, "I2", "BIRT", 1982, 4, 1); // outside

        let rows = db
            .query_events(&tree, 3 * 32 + 9, 3 * 32 + 13, &[EventKind::Birth], true)
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].xref, "I1");
        assert_eq!(rows[0].year, 1950);
        assert_eq!(rows[1].xref, "I2");
    }

    #[test]
    fn deceased_filter_applies_at_query_level() {
        let (db, tree) = db_with_tree();
        insert_person(&db, "I1", true);
        insert_date(&db, "I1", "BIRT", 1910, 3, 10);

        let hidden = db
            .query_events(&tree, 3 * 32 + 1, 4 * 32, &[EventKind::Birth], false)
            .unwrap();
        assert!(hidden.is_empty());

        let shown = db
            .query_events(&tree, 3 * 32 + 1, 4 * 32, &[EventKind::Birth], true)
            .unwrap();
        assert_eq!(shown.len(), 1);
    }

    #[test]
    fn tag_filter_and_empty_tags() {
        let (db, tree) = db_with_tree();
        insert_person(&db, "I1", false);
        insert_date(&db, "I1", "BIRT", 1950, 3, 10);
        insert_date(&db, "I1", "DEAT", 2020, 3, 11);

        let births = db
            .query_events(&tree, 3 * 32, 4 * 32, &[EventKind::Birth], true)
            .unwrap();
        assert_eq!(births.len(), 1);
        assert_eq!(births[0].event, EventKind::Birth);

        let both = db
            .query_events(
                &tree,
                3 * 32,
                4 * 32,
                &[EventKind::Birth, EventKind::Death],
                true,
            )
            .unwrap();
        assert_eq!(both.len(), 2);

        assert!(db.query_events(&tree, 3 * 32, 4 * 32, &[], true).unwrap().is_empty());
    }

    #[test]
    fn degenerate_range_is_empty() {
        let (db, tree) = db_with_tree();
        insert_person(&db, "I1", false);
        insert_date(&db, "I1", "BIRT", 1950, 3, 10);
        assert!(
            db.query_events(&tree, 3 * 32 + 10, 3 * 32 + 10, &[EventKind::Birth], true)
                .unwrap()
                .is_empty()
        );
    }
}
