//! Collaborator traits consumed by the digest engine.
//!
//! Everything here is synchronous: a run is one serial batch and every
//! blocking call executes inline (no worker pool, no task queue). The
//! SQLite implementations live in `treemail-store`, the SMTP mailer in
//! `treemail-mailer`, and the tests use in-memory fakes.

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::Result;
use crate::types::{Entity, EventKind, Tree, User, ViewContext};

/// Raw change-log row, as stored. One row per accepted edit.
#[derive(Debug, Clone)]
pub struct ChangeRow {
    /// Stable external reference of the edited record.
    pub xref: String,
    /// Monotonic change sequence number.
    pub change_id: i64,
    /// When the edit was accepted (UTC).
    pub timestamp: NaiveDateTime,
    /// Username of the editor.
    pub actor: String,
    /// Record payload as of this change (used to resolve the entity).
    pub payload: String,
}

/// Raw calendar row: one recurring date event attached to a record.
#[derive(Debug, Clone)]
pub struct CalendarRow {
    pub xref: String,
    pub event: EventKind,
    /// Historical year of the event.
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

/// Raw announcement row.
#[derive(Debug, Clone)]
pub struct NewsRow {
    pub id: i64,
    /// UTC.
    pub timestamp: NaiveDateTime,
    pub subject: String,
    pub body: String,
}

/// A media file backing a portrait.
#[derive(Debug, Clone)]
pub struct MediaFile {
    pub path: String,
    pub mime: String,
}

/// Lists the available trees.
pub trait TreeSource {
    fn list_trees(&self) -> Result<Vec<Tree>>;
}

/// Lists registered users and resolves them by name.
pub trait UserSource {
    fn list_users(&self) -> Result<Vec<User>>;
    fn find_by_username(&self, username: &str) -> Result<Option<User>>;
}

/// Accepted-change query over the half-open window `[start, end)`.
pub trait ChangeLogStore {
    /// Return accepted, non-empty change rows for the tree inside the
    /// window. The store may return several rows per xref; the
    /// aggregator keeps only the highest change id.
    fn query_accepted(
        &self,
        tree: &Tree,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<ChangeRow>>;
}

/// Recurring-date query, year independent.
///
/// `start_md`/`end_md` are month-day indexes (`month * 32 + day`,
/// half-open): monotonic within a year and identical across years, so a
/// single range matches events from every historical year. Windows that
/// cross Dec 31 are issued as two queries by the caller.
pub trait CalendarSource {
    fn query_events(
        &self,
        tree: &Tree,
        start_md: u32,
        end_md: u32,
        tags: &[EventKind],
        include_deceased: bool,
    ) -> Result<Vec<CalendarRow>>;
}

/// Announcement range query over `[start, end)`.
pub trait NewsStore {
    fn query(&self, tree: &Tree, start: NaiveDateTime, end: NaiveDateTime)
    -> Result<Vec<NewsRow>>;
}

/// Resolves change-log xrefs to current records and answers visibility.
pub trait EntityResolver {
    /// Resolve an xref to its current record. `None` when the record no
    /// longer exists or the payload is unusable; never an error for a
    /// merely-missing record.
    fn resolve(&self, tree: &Tree, xref: &str, payload: Option<&str>) -> Result<Option<Entity>>;

    /// Whether `viewer` may see this record. The viewer is an explicit
    /// parameter; resolution never impersonates a session.
    fn is_visible(&self, tree: &Tree, entity: &Entity, viewer: &ViewContext) -> bool;

    /// Primary portrait media file of an individual, if any.
    fn portrait(&self, tree: &Tree, xref: &str) -> Result<Option<MediaFile>>;
}

/// Renders a media file into thumbnail bytes. `Ok(None)` when the file
/// is missing or unreadable (the digest omits the portrait).
pub trait Thumbnailer {
    fn render(&self, media: &MediaFile, width: u32, height: u32) -> Result<Option<Vec<u8>>>;
}

/// Outbound mail transport. `Ok(false)` and `Err(_)` both count as a
/// delivery failure for the dispatch report.
pub trait Mailer {
    #[allow(clippy::too_many_arguments)]
    fn send(
        &self,
        from: &str,
        to: &User,
        reply_to: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<bool>;
}

/// Persisted schedule state: the last completed-run date.
pub trait ScheduleStore {
    /// `None` when never sent or when the persisted value fails to
    /// parse as a date.
    fn last_send(&self) -> Option<NaiveDate>;

    /// Persist `date` as the new last-send. Called exactly once, after
    /// the recipient loop completes; never on skip.
    fn record_send(&self, date: NaiveDate) -> Result<()>;
}
