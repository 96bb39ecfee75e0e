//! Schedule clock — when did the last run happen, when is this one,
//! when is the next one due.
//!
//! The persisted last-send date is the only state shared across
//! invocations: read once at the start of a run, written once after
//! the recipient loop completes. A skipped run writes nothing.

use chrono::NaiveDate;

use treemail_core::error::Result;
use treemail_core::traits::ScheduleStore;

use crate::model::RunWindow;

/// Computes run windows from persisted schedule state.
pub struct ScheduleClock<'a> {
    store: &'a dyn ScheduleStore,
}

impl<'a> ScheduleClock<'a> {
    pub fn new(store: &'a dyn ScheduleStore) -> Self {
        Self { store }
    }

    /// Persisted last-send date; unparsable values read as "never
    /// sent" (the store contract already folds those to `None`).
    pub fn last_send(&self) -> Option<NaiveDate> {
        self.store.last_send()
    }

    /// Compute this run's window from the persisted state.
    pub fn window(&self, today: NaiveDate, interval_days: i64) -> RunWindow {
        RunWindow::for_schedule(self.last_send(), today, interval_days)
    }

    /// Persist `today` as the new last-send. Call exactly once, after
    /// the recipient loop has finished — regardless of per-recipient
    /// failures, never on skip.
    pub fn record_send(&self, today: NaiveDate) -> Result<()> {
        tracing::info!("Recording digest run for {today}");
        self.store.record_send(today)
    }
}

/// A run is due once today has reached the computed this-send date.
/// With `interval_days <= 0` every invocation is due.
pub fn is_due(this_send: NaiveDate, today: NaiveDate) -> bool {
    today >= this_send
}
