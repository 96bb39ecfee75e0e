//! Pure calendar-date arithmetic for recurring events.
//!
//! Recurring anniversaries are matched on month and day only, across
//! every historical year. The month-day index (`month * 32 + day`) is
//! monotonic within a year and identical across years, which makes a
//! window query a plain integer range — no julian-day conversions.

use chrono::{Datelike, Duration, NaiveDate};

/// Month-day index: monotonic within a year, year independent.
pub fn md_index(month: u32, day: u32) -> u32 {
    month * 32 + day
}

/// Bucket key for an anniversary: `-MM-DD`, year independent, sorts
/// ascending by month then day.
pub fn month_day_key(month: u32, day: u32) -> String {
    format!("-{month:02}-{day:02}")
}

/// Half-open month-day index ranges covering `[start, end)`.
///
/// Same-year windows produce one range; windows crossing Dec 31
/// produce two (tail of the old year, head of the new). Windows of a
/// year or longer clamp to the full year: every recurring event
/// matches at most once per run.
pub fn md_ranges(start: NaiveDate, end: NaiveDate) -> Vec<(u32, u32)> {
    if start >= end {
        return Vec::new();
    }
    let full_year = (md_index(1, 1), md_index(12, 31) + 1);
    if end - start >= Duration::days(366) {
        return vec![full_year];
    }
    let s = md_index(start.month(), start.day());
    let e = md_index(end.month(), end.day());
    if start.year() == end.year() {
        vec![(s, e)]
    } else if s == e {
        // Exactly one year apart.
        vec![full_year]
    } else {
        vec![(s, full_year.1), (full_year.0, e)]
    }
}

/// Project a recurring month-day onto the window `[start, end)`.
///
/// Returns the concrete date in the window's year when the event
/// occurs inside the window, `None` otherwise. Feb 29 events only
/// project onto leap years.
pub fn project_into(month: u32, day: u32, start: NaiveDate, end: NaiveDate) -> Option<NaiveDate> {
    for year in start.year()..=end.year() {
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day)
            && date >= start
            && date < end
        {
            return Some(date);
        }
    }
    None
}
