//! Time and timestamp helpers.

use chrono::{DateTime, DurationRound, TimeDelta, Utc};

/// UTC timestamp used for observation instants, `last_reading_at`, etc.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Truncate a timestamp to the top of its hour (minutes, seconds and
/// sub-seconds zeroed).
///
/// Readings produced by a collection run all share this normalized instant,
/// which is what makes the `(meter, kind, timestamp)` key idempotent across
/// re-runs within the same hour.
#[must_use]
pub fn truncate_to_hour(ts: Timestamp) -> Timestamp {
    // Only fails for out-of-range timestamps, which `DateTime<Utc>` cannot hold
    // for an hour-sized delta.
    ts.duration_trunc(TimeDelta::hours(1)).unwrap_or(ts)
}

/// Parse an RFC 3339 timestamp into UTC.
///
/// # Errors
///
/// Returns the chrono parse error when `value` is not valid RFC 3339.
pub fn parse_rfc3339(value: &str) -> Result<Timestamp, chrono::ParseError> {
    DateTime::parse_from_rfc3339(value).map(|dt| dt.to_utc())
}
