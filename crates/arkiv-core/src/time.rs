//! Timestamp formatting.
//!
//! Persisted documents carry dates as fixed-width UTC strings with millisecond
//! precision (`2024-03-01T10:15:30.250`). Strings in this format sort in
//! chronological order, which the journal query engine relies on.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::{CoreError, CoreResult};

const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

/// Current time, truncated to the persisted precision.
#[must_use]
pub fn now() -> DateTime<Utc> {
    let now = Utc::now();
    parse_timestamp(&format_timestamp(&now)).unwrap_or(now)
}

/// Render a timestamp in the persisted format.
#[must_use]
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(FORMAT).to_string()
}

/// Parse a persisted timestamp.
///
/// Accepts the persisted format and RFC 3339.
///
/// # Errors
///
/// Returns [`CoreError::InvalidTimestamp`] if neither format matches.
pub fn parse_timestamp(value: &str) -> CoreResult<DateTime<Utc>> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, FORMAT) {
        return Ok(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| CoreError::InvalidTimestamp {
            value: value.to_string(),
            reason: e.to_string(),
        })
}
