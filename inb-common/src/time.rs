//! Timestamp and calendar-date utilities
//!
//! Entries are keyed by literal calendar date (`YYYY-MM-DD`). "Today" is the
//! device-local date; timestamps are UTC ISO-8601 strings with millisecond
//! precision so they sort lexicographically.

use chrono::{DateTime, Local, NaiveDate, SecondsFormat, Utc};

/// Calendar date format used as the entry key
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Current UTC timestamp as an ISO-8601 string (`2025-03-01T09:30:00.000Z`)
pub fn now_iso() -> String {
    to_iso(now())
}

/// Format a timestamp the way stored documents carry it
pub fn to_iso(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Device-local calendar date of today
pub fn today_local() -> String {
    Local::now().date_naive().format(DATE_FORMAT).to_string()
}

/// Parse an entry key, rejecting anything that is not a real `YYYY-MM-DD` date
pub fn parse_date(date: &str) -> Option<NaiveDate> {
    if date.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(date, DATE_FORMAT).ok()
}

/// True if `date` is a well-formed entry key
pub fn is_valid_date(date: &str) -> bool {
    parse_date(date).is_some()
}

/// Only today's entry is writable; past entries are read-only
pub fn is_today(date: &str) -> bool {
    date == today_local()
}

/// Entry keys compare lexicographically, so string comparison is date order
pub fn is_future(date: &str) -> bool {
    date > today_local().as_str()
}

/// Convert milliseconds to duration
pub fn millis_to_duration(millis: u64) -> std::time::Duration {
    std::time::Duration::from_millis(millis)
}
