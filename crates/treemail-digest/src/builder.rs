//! Digest assembly: one pass over the configured trees, each category
//! gated by its enable flag, empty trees suppressed unless configured
//! otherwise.

use treemail_core::config::DigestSettings;
use treemail_core::error::Result;
use treemail_core::traits::{
    CalendarSource, ChangeLogStore, EntityResolver, NewsStore, Thumbnailer, TreeSource,
};
use treemail_core::types::ViewContext;

use crate::anniversaries::AnniversaryAggregator;
use crate::changes::ChangeAggregator;
use crate::model::{Digest, RunWindow, TreeDigest, WindowDates};
use crate::news::NewsAggregator;

/// Composes the three aggregators across the configured trees.
pub struct DigestBuilder<'a> {
    pub trees: &'a dyn TreeSource,
    pub changes: &'a dyn ChangeLogStore,
    pub calendar: &'a dyn CalendarSource,
    pub news: &'a dyn NewsStore,
    pub resolver: &'a dyn EntityResolver,
    pub thumbnailer: &'a dyn Thumbnailer,
}

impl DigestBuilder<'_> {
    /// Build the digest for one run window, under one viewing context.
    ///
    /// Trees are processed independently; a tree appears in the result
    /// iff it is selected and (`show_empty` or some enabled category
    /// produced at least one item).
    pub fn build(
        &self,
        settings: &DigestSettings,
        window: &RunWindow,
        viewer: &ViewContext,
    ) -> Result<Digest> {
        let change_agg = ChangeAggregator::new(self.changes, self.resolver);
        let news_agg = NewsAggregator::new(self.news);
        let ann_agg = AnniversaryAggregator::new(self.calendar, self.resolver, self.thumbnailer);

        let mut digest = Digest::default();
        for tree in self.trees.list_trees()? {
            if !settings.tree_selected(&tree.name) {
                continue;
            }

            let news = if settings.news.enabled {
                Some(news_agg.get(&tree, window)?)
            } else {
                None
            };
            let changes = if settings.changes.enabled {
                Some(change_agg.get(&tree, window, &settings.changes.tags, viewer)?)
            } else {
                None
            };
            let anniversaries = if settings.anniversaries.enabled {
                Some(ann_agg.get(
                    &tree,
                    window,
                    &settings.anniversaries.tags,
                    settings.anniversaries.include_deceased,
                    settings.image_mode,
                    &settings.base_url,
                    viewer,
                )?)
            } else {
                None
            };

            let tree_digest = TreeDigest {
                dates: WindowDates::from(window),
                news,
                changes,
                anniversaries,
            };
            if settings.show_empty || !tree_digest.is_empty() {
                digest.trees.insert(tree.name, tree_digest);
            } else {
                tracing::debug!(tree = %tree.name, "Suppressing empty tree digest");
            }
        }
        Ok(digest)
    }
}
