//! Digest data model — everything a run produces.
//!
//! All of it is transient: constructed fresh per run from the stores
//! and discarded after delivery. Bucketed categories use `BTreeMap`
//! so bucket keys always come out sorted ascending.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::collections::BTreeMap;

use treemail_core::types::{EntityKind, EventKind};

/// The three schedule dates of a run plus the derived query bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunWindow {
    /// Date of the last completed run, if any.
    pub last: Option<NaiveDate>,
    /// Logical date of this run.
    pub this: NaiveDate,
    /// When the next run becomes due.
    pub next: NaiveDate,
}

impl RunWindow {
    /// Compute the window from persisted schedule state.
    ///
    /// `this = last + interval` when a last-send exists, otherwise
    /// today at midnight; `next = this + interval`. With
    /// `interval_days <= 0` the derived query windows are empty but
    /// nothing panics.
    pub fn for_schedule(last: Option<NaiveDate>, today: NaiveDate, interval_days: i64) -> Self {
        let this = match last {
            Some(date) => date + Duration::days(interval_days),
            None => today,
        };
        Self {
            last,
            this,
            next: this + Duration::days(interval_days),
        }
    }

    /// Half-open bounds of the change/news window:
    /// `[last_send or this − interval, this)`, at midnight.
    ///
    /// The fallback anchors one interval before `this` rather than at
    /// the epoch, so a first-ever run reports one interval of history
    /// instead of all of it.
    pub fn change_bounds(&self) -> (NaiveDateTime, NaiveDateTime) {
        let interval = self.next - self.this;
        let start = self.last.unwrap_or(self.this - interval);
        (
            start.and_hms_opt(0, 0, 0).unwrap_or_default(),
            self.this.and_hms_opt(0, 0, 0).unwrap_or_default(),
        )
    }

    /// Half-open date bounds of the anniversary window: `[this, next)`.
    /// Anniversaries look forward to the events occurring before the
    /// next digest goes out.
    pub fn anniversary_bounds(&self) -> (NaiveDate, NaiveDate) {
        (self.this, self.next)
    }
}

/// The last/this/next dates as they appear in the digest output.
#[derive(Debug, Clone, Serialize)]
pub struct WindowDates {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last: Option<NaiveDate>,
    pub this: NaiveDate,
    pub next: NaiveDate,
}

impl From<&RunWindow> for WindowDates {
    fn from(w: &RunWindow) -> Self {
        Self {
            last: w.last,
            this: w.this,
            next: w.next,
        }
    }
}

/// One reported edit: the latest accepted change of a record inside
/// the window. At most one per xref.
#[derive(Debug, Clone, Serialize)]
pub struct ChangeRecord {
    pub kind: EntityKind,
    pub xref: String,
    pub name: String,
    pub url: String,
    pub timestamp: NaiveDateTime,
    pub actor: String,
}

/// One upcoming anniversary, projected into the window's year.
#[derive(Debug, Clone, Serialize)]
pub struct AnniversaryEvent {
    pub kind: EntityKind,
    pub xref: String,
    pub event: EventKind,
    pub name: String,
    pub url: String,
    /// Projected occurrence (year of the queried window, not the
    /// historical year).
    pub date: NaiveDate,
    /// Calendar years since the historical event.
    pub age: i32,
    /// Portrait URLs (data: or link), one per subject; per spouse for
    /// family events. Empty when images are off or media is missing.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub portraits: Vec<String>,
}

/// One announcement.
#[derive(Debug, Clone, Serialize)]
pub struct NewsItem {
    pub id: i64,
    pub timestamp: NaiveDateTime,
    pub subject: String,
    pub body: String,
}

/// Per-tree digest. A category is `None` when disabled in settings and
/// then absent from the JSON output.
#[derive(Debug, Clone, Serialize)]
pub struct TreeDigest {
    pub dates: WindowDates,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub news: Option<Vec<NewsItem>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changes: Option<BTreeMap<String, Vec<ChangeRecord>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anniversaries: Option<BTreeMap<String, Vec<AnniversaryEvent>>>,
}

impl TreeDigest {
    /// True when every enabled category produced zero items.
    pub fn is_empty(&self) -> bool {
        self.news.as_ref().is_none_or(Vec::is_empty)
            && self.changes.as_ref().is_none_or(BTreeMap::is_empty)
            && self.anniversaries.as_ref().is_none_or(BTreeMap::is_empty)
    }
}

/// The whole run result: tree name → per-tree digest, tree names
/// ascending.
#[derive(Debug, Clone, Serialize, Default)]
pub struct Digest {
    #[serde(flatten)]
    pub trees: BTreeMap<String, TreeDigest>,
}

impl Digest {
    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }
}

/// Outcome of one dispatch run.
#[derive(Debug, Clone, Serialize, Default)]
pub struct DispatchReport {
    pub succeeded: Vec<String>,
    pub failed: Vec<String>,
}
