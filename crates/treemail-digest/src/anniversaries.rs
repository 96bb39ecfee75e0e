//! Anniversary aggregation: recurring birth/death/marriage dates
//! projected onto the upcoming window, year independent.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::Datelike;
use std::collections::BTreeMap;

use treemail_core::error::Result;
use treemail_core::traits::{CalendarRow, CalendarSource, EntityResolver, Thumbnailer};
use treemail_core::types::{Entity, EntityKind, EventKind, ImageMode, Tree, ViewContext};

use crate::dates;
use crate::model::{AnniversaryEvent, RunWindow};

/// Edge length of portrait thumbnails, in pixels.
pub const PORTRAIT_SIZE: u32 = 50;

/// Aggregates recurring calendar events into month-day buckets.
pub struct AnniversaryAggregator<'a> {
    calendar: &'a dyn CalendarSource,
    resolver: &'a dyn EntityResolver,
    thumbnailer: &'a dyn Thumbnailer,
}

impl<'a> AnniversaryAggregator<'a> {
    pub fn new(
        calendar: &'a dyn CalendarSource,
        resolver: &'a dyn EntityResolver,
        thumbnailer: &'a dyn Thumbnailer,
    ) -> Self {
        Self {
            calendar,
            resolver,
            thumbnailer,
        }
    }

    /// Collect anniversaries for one tree over `[this_send, next_send)`.
    ///
    /// An event from any historical year is reported when its month-day
    /// falls inside the window this year. Events sharing a calendar day
    /// co-bucket under the same `-MM-DD` key regardless of year.
    #[allow(clippy::too_many_arguments)]
    pub fn get(
        &self,
        tree: &Tree,
        window: &RunWindow,
        tags: &[EventKind],
        include_deceased: bool,
        image_mode: ImageMode,
        base_url: &str,
        viewer: &ViewContext,
    ) -> Result<BTreeMap<String, Vec<AnniversaryEvent>>> {
        let (start, end) = window.anniversary_bounds();
        let mut rows: Vec<CalendarRow> = Vec::new();
        for (md_start, md_end) in dates::md_ranges(start, end) {
            rows.extend(
                self.calendar
                    .query_events(tree, md_start, md_end, tags, include_deceased)?,
            );
        }

        let mut buckets: BTreeMap<String, Vec<AnniversaryEvent>> = BTreeMap::new();
        for row in rows {
            let Some(projected) = dates::project_into(row.month, row.day, start, end) else {
                continue;
            };
            let Some(entity) = self.resolver.resolve(tree, &row.xref, None)? else {
                continue;
            };
            if !self.resolver.is_visible(tree, &entity, viewer) {
                continue;
            }
            if entity.deceased && !include_deceased {
                continue;
            }

            let portraits = self.portraits_for(tree, &entity, image_mode, base_url)?;
            let key = dates::month_day_key(projected.month(), projected.day());
            buckets.entry(key).or_default().push(AnniversaryEvent {
                kind: entity.kind,
                xref: entity.xref,
                event: row.event,
                name: entity.name,
                url: entity.url,
                date: projected,
                age: projected.year() - row.year,
                portraits,
            });
        }

        for events in buckets.values_mut() {
            events.sort_by(|a, b| a.name.cmp(&b.name).then(a.xref.cmp(&b.xref)));
        }
        Ok(buckets)
    }

    /// Portraits for an event subject. Individuals contribute their own
    /// portrait; family events contribute one per resolvable spouse, in
    /// spouse order. Missing media contributes nothing.
    fn portraits_for(
        &self,
        tree: &Tree,
        entity: &Entity,
        image_mode: ImageMode,
        base_url: &str,
    ) -> Result<Vec<String>> {
        if image_mode == ImageMode::None {
            return Ok(Vec::new());
        }
        let subjects: Vec<&str> = match entity.kind {
            EntityKind::Individual => vec![entity.xref.as_str()],
            EntityKind::Family => entity.spouses.iter().map(String::as_str).collect(),
            _ => Vec::new(),
        };

        let mut portraits = Vec::new();
        for xref in subjects {
            match image_mode {
                ImageMode::None => {}
                ImageMode::Link => {
                    if self.resolver.portrait(tree, xref)?.is_some() {
                        portraits.push(format!(
                            "{base_url}/digest/image?tree={}&xref={xref}",
                            tree.name
                        ));
                    }
                }
                ImageMode::DataUrl => {
                    let Some(media) = self.resolver.portrait(tree, xref)? else {
                        continue;
                    };
                    match self.thumbnailer.render(&media, PORTRAIT_SIZE, PORTRAIT_SIZE) {
                        Ok(Some(bytes)) => {
                            portraits.push(format!(
                                "data:{};base64,{}",
                                media.mime,
                                BASE64.encode(&bytes)
                            ));
                        }
                        Ok(None) => {}
                        Err(e) => {
                            // Missing portrait media is a row-level
                            // omission, never a run failure.
                            tracing::warn!(xref, "Thumbnail failed: {e}");
                        }
                    }
                }
            }
        }
        Ok(portraits)
    }
}
