//! Trailing analysis windows and platform timestamp parsing.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Error, Result};

/// A closed `[start, end]` time range ending at the analysis reference time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub days: u32,
}

impl TimeWindow {
    /// Window covering the `days` days up to and including `end`.
    pub fn trailing(end: DateTime<Utc>, days: u32) -> Self {
        Self {
            start: end - Duration::days(i64::from(days)),
            end,
            days,
        }
    }

    /// Both bounds are inclusive.
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at <= self.end
    }

    /// Period label such as `30d`.
    pub fn label(&self) -> String {
        period_label(self.days)
    }
}

/// Label used for period keys (`7d`, `15d`, ...).
pub fn period_label(days: u32) -> String {
    format!("{days}d")
}

/// Parse an ISO-8601 timestamp as emitted by the hosting platform.
///
/// Accepts `Z` or numeric offsets, with or without fractional seconds.
/// Timestamps without any offset are taken as UTC.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    let trimmed = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| Error::timestamp(value, e.to_string()))
}

/// Parse an issue due date: either `YYYY-MM-DD` (end of that day, UTC) or a
/// full timestamp.
pub fn parse_due_date(value: &str) -> Result<DateTime<Utc>> {
    let trimmed = value.trim();
    if trimmed.contains('T') {
        return parse_timestamp(trimmed);
    }
    let date = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .map_err(|e| Error::timestamp(value, e.to_string()))?;
    let end_of_day = NaiveTime::from_hms_opt(23, 59, 59)
        .ok_or_else(|| Error::timestamp(value, "invalid end of day"))?;
    Ok(date.and_time(end_of_day).and_utc())
}

/// Whole days elapsed between `earlier` and `later` (floored, never negative).
pub fn days_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> i64 {
    (later - earlier).num_days().max(0)
}
