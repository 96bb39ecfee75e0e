//! Announcement aggregation: a plain range query, ascending, no dedup,
//! no visibility filtering (announcements are tree-scoped).

use treemail_core::error::Result;
use treemail_core::traits::NewsStore;
use treemail_core::types::Tree;

use crate::model::{NewsItem, RunWindow};

/// Collects announcements for the change window.
pub struct NewsAggregator<'a> {
    store: &'a dyn NewsStore,
}

impl<'a> NewsAggregator<'a> {
    pub fn new(store: &'a dyn NewsStore) -> Self {
        Self { store }
    }

    /// Announcements in `[start, end)`, ordered ascending by timestamp.
    pub fn get(&self, tree: &Tree, window: &RunWindow) -> Result<Vec<NewsItem>> {
        let (start, end) = window.change_bounds();
        if start >= end {
            return Ok(Vec::new());
        }
        let mut items: Vec<NewsItem> = self
            .store
            .query(tree, start, end)?
            .into_iter()
            .map(|row| NewsItem {
                id: row.id,
                timestamp: row.timestamp,
                subject: row.subject,
                body: row.body,
            })
            .collect();
        items.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)));
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use treemail_core::traits::NewsRow;

    struct FakeNews {
        rows: Vec<NewsRow>,
    }

    impl NewsStore for FakeNews {
        fn query(
            &self,
            _tree: &Tree,
            start: NaiveDateTime,
            end: NaiveDateTime,
        ) -> Result<Vec<NewsRow>> {
            Ok(self
                .rows
                .iter()
                .filter(|r| r.timestamp >= start && r.timestamp < end)
                .cloned()
                .collect())
        }
    }

    fn ts(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn tree() -> Tree {
        Tree {
            id: 1,
            name: "demo".into(),
            title: "Demo".into(),
        }
    }

    #[test]
    fn items_ordered_ascending_without_dedup() {
        let store = FakeNews {
            rows: vec![
                NewsRow {
                    id: 2,
                    timestamp: ts(5, 12),
                    subject: "Second".into(),
                    body: "".into(),
                },
                NewsRow {
                    id: 1,
                    timestamp: ts(2, 9),
                    subject: "First".into(),
                    body: "".into(),
                },
                NewsRow {
                    id: 3,
                    timestamp: ts(2, 9),
                    subject: "First again".into(),
                    body: "".into(),
                },
            ],
        };
        let window = RunWindow::for_schedule(
            Some(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
            NaiveDate::from_ymd_opt(2024, 1, 8).unwrap(),
            7,
        );
        let items = NewsAggregator::new(&store).get(&tree(), &window).unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(
            items.iter().map(|i| i.id).collect::<Vec<_>>(),
            vec![1, 3, 2]
        );
    }

    #[test]
    fn degenerate_window_is_empty() {
        let store = FakeNews { rows: vec![] };
        let this = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        let window = RunWindow {
            last: Some(this),
            this,
            next: this,
        };
        let items = NewsAggregator::new(&store).get(&tree(), &window).unwrap();
        assert!(items.is_empty());
    }
}
