//! Change-list aggregation: one entry per edited record, latest
//! accepted state wins.

use std::collections::{BTreeMap, HashMap};

use treemail_core::error::Result;
use treemail_core::traits::{ChangeLogStore, ChangeRow, EntityResolver};
use treemail_core::types::{EntityKind, Tree, ViewContext};

use crate::model::{ChangeRecord, RunWindow};

/// Aggregates the change log into day buckets.
pub struct ChangeAggregator<'a> {
    log: &'a dyn ChangeLogStore,
    resolver: &'a dyn EntityResolver,
}

impl<'a> ChangeAggregator<'a> {
    pub fn new(log: &'a dyn ChangeLogStore, resolver: &'a dyn EntityResolver) -> Self {
        Self { log, resolver }
    }

    /// Collect changes for one tree over the window's change bounds.
    ///
    /// Pipeline: fetch accepted rows in `[start, end)`; keep the
    /// highest change id per xref (however many intermediate edits
    /// happened); resolve each survivor; drop unresolvable or
    /// invisible records silently; drop kinds outside the allow-list;
    /// bucket by the `YYYY-MM-DD` day of the change timestamp.
    pub fn get(
        &self,
        tree: &Tree,
        window: &RunWindow,
        allowed: &[EntityKind],
        viewer: &ViewContext,
    ) -> Result<BTreeMap<String, Vec<ChangeRecord>>> {
        let (start, end) = window.change_bounds();
        if start >= end {
            return Ok(BTreeMap::new());
        }

        let rows = self.log.query_accepted(tree, start, end)?;
        let total = rows.len();

        // Latest state wins: one surviving row per xref.
        let mut latest: HashMap<String, ChangeRow> = HashMap::new();
        for row in rows {
            match latest.get(&row.xref) {
                Some(kept) if kept.change_id >= row.change_id => {}
                _ => {
                    latest.insert(row.xref.clone(), row);
                }
            }
        }

        let mut buckets: BTreeMap<String, Vec<ChangeRecord>> = BTreeMap::new();
        for row in latest.into_values() {
            let Some(entity) = self.resolver.resolve(tree, &row.xref, Some(&row.payload))? else {
                tracing::debug!(xref = %row.xref, "Dropping change: record did not resolve");
                continue;
            };
            if !self.resolver.is_visible(tree, &entity, viewer) {
                continue;
            }
            if !allowed.contains(&entity.kind) {
                continue;
            }
            let day = row.timestamp.format("%Y-%m-%d").to_string();
            buckets.entry(day).or_default().push(ChangeRecord {
                kind: entity.kind,
                xref: entity.xref,
                name: entity.name,
                url: entity.url,
                timestamp: row.timestamp,
                actor: row.actor,
            });
        }

        // Deterministic order inside each day bucket.
        for records in buckets.values_mut() {
            records.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.xref.cmp(&b.xref)));
        }

        tracing::debug!(
            tree = %tree.name,
            rows = total,
            kept = buckets.values().map(Vec::len).sum::<usize>(),
            "Change aggregation done"
        );
        Ok(buckets)
    }
}
