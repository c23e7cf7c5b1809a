//! Fetch window resolution from the newest stored dive.

use chrono::{Days, NaiveDate};

use crate::error::{SyncError, SyncResult};

/// Days re-fetched before the cursor to pick up late uploads and edits.
pub const OVERLAP_DAYS: u64 = 2;

/// Inclusive date range to query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// The calendar date at the front of a stored timestamp.
///
/// Accepts Garmin's `YYYY-MM-DD HH:MM:SS` as well as ISO 8601 strings.
pub fn cursor_date(timestamp: &str) -> SyncResult<NaiveDate> {
    timestamp
        .trim()
        .get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
        .ok_or_else(|| SyncError::InvalidCursorFormat(timestamp.to_string()))
}

/// Next window to fetch given the newest stored `startTimeGMT`.
///
/// With a cursor the window starts [`OVERLAP_DAYS`] before it; on an empty
/// store it reaches back `lookback_days`. Both end today.
pub fn resolve(
    last_start_gmt: Option<&str>,
    today: NaiveDate,
    lookback_days: u32,
) -> SyncResult<DateRange> {
    let start = match last_start_gmt {
        Some(ts) => cursor_date(ts)?
            .checked_sub_days(Days::new(OVERLAP_DAYS))
            .ok_or_else(|| SyncError::InvalidCursorFormat(ts.to_string()))?,
        None => today
            .checked_sub_days(Days::new(u64::from(lookback_days)))
            .ok_or_else(|| {
                SyncError::Configuration(format!("lookback of {lookback_days} days is out of range"))
            })?,
    };
    Ok(DateRange { start, end: today })
}
