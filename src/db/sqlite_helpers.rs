//! SQLite helper utilities for type conversion
//!
//! SQLite has no native timestamp type. Timestamps are stored as ISO8601 TEXT
//! and converted here.

use anyhow::{Result, anyhow};
use chrono::{DateTime, NaiveDateTime, Utc};

/// Formats accepted for timestamps written without a UTC offset
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"];

/// Convert a chrono DateTime to ISO8601 string
#[inline]
pub fn datetime_to_str(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

/// Parse an ISO8601 string to DateTime
///
/// Values without an offset (SQLite's `datetime()` output, naive ISO
/// timestamps from older databases) are read as UTC.
pub fn str_to_datetime(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|ndt| ndt.and_utc())
        .ok_or_else(|| anyhow!("Invalid datetime '{}'", s))
}

/// Parse an optional datetime string
#[inline]
pub fn str_to_datetime_opt(s: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    match s {
        Some(s) if !s.is_empty() => Ok(Some(str_to_datetime(s)?)),
        _ => Ok(None),
    }
}
