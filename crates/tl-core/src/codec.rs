//! Text encoding of timestamps and durations.
//!
//! Timestamps are written as `YYYY-MM-DDTHH:MM:SSZ` and durations use the
//! ISO 8601 subset `P[nD][T[nH][nM][nS]]`. Both work at whole-second
//! resolution; anything finer is dropped when parsing.

use std::sync::LazyLock;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, SubsecRound, Utc};
use regex::Regex;
use thiserror::Error;

/// Canonical output format for timestamps.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

const SECONDS_PER_MINUTE: i64 = 60;
const SECONDS_PER_HOUR: i64 = 60 * SECONDS_PER_MINUTE;
const SECONDS_PER_DAY: i64 = 24 * SECONDS_PER_HOUR;

/// Pre-compiled regex for the accepted duration grammar.
static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^P(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?)?$").unwrap()
});

/// Formats with an explicit numeric offset that RFC 3339 parsing misses.
const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"];

/// Offset-less formats, read as UTC.
const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Text that could not be decoded.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid timestamp: {0:?}")]
    Timestamp(String),

    #[error("invalid duration: {0:?} (expected P[nD][T[nH][nM][nS]])")]
    Duration(String),
}

/// Current time, truncated to whole seconds.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

/// Parses a timestamp, converting it to UTC.
///
/// The empty string means "now". Accepted inputs:
/// - RFC 3339: `2024-01-15T10:30:00Z`, `2024-01-15T12:30:00+02:00`
/// - numeric offsets without a colon: `2024-01-15T12:30:00+0200`
/// - no offset, read as UTC: `2024-01-15T10:30:00`, `2024-01-15 10:30`
/// - a bare date, read as midnight UTC: `2024-01-15`
pub fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, ParseError> {
    if text.is_empty() {
        return Ok(now());
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc).trunc_subsecs(0));
    }

    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(text, format) {
            return Ok(dt.with_timezone(&Utc).trunc_subsecs(0));
        }
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(naive.and_utc().trunc_subsecs(0));
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN).and_utc());
    }

    Err(ParseError::Timestamp(text.to_string()))
}

/// Formats a timestamp as `YYYY-MM-DDTHH:MM:SSZ`.
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

/// Parses a `P[nD][T[nH][nM][nS]]` duration. The empty string is zero.
pub fn parse_duration(text: &str) -> Result<Duration, ParseError> {
    if text.is_empty() {
        return Ok(Duration::zero());
    }

    let invalid = || ParseError::Duration(text.to_string());
    let caps = DURATION_RE.captures(text).ok_or_else(invalid)?;

    let units = [
        (1, SECONDS_PER_DAY),
        (2, SECONDS_PER_HOUR),
        (3, SECONDS_PER_MINUTE),
        (4, 1),
    ];

    let mut total: i64 = 0;
    let mut matched_any = false;
    for (group, seconds_per_unit) in units {
        let Some(value) = caps.get(group) else {
            continue;
        };
        matched_any = true;
        let value: i64 = value.as_str().parse().map_err(|_| invalid())?;
        total = value
            .checked_mul(seconds_per_unit)
            .and_then(|seconds| total.checked_add(seconds))
            .ok_or_else(invalid)?;
    }

    // "P" and "PT" match the grammar but name no component.
    if !matched_any {
        return Err(invalid());
    }

    Duration::try_seconds(total).ok_or_else(invalid)
}

/// Formats a duration, omitting zero components.
///
/// Zero (and anything shorter than a second) formats as the empty string,
/// which is how a running event is written. Hours, minutes and seconds are
/// padded to two digits; days are not.
pub fn format_duration(duration: Duration) -> String {
    let total = duration.num_seconds();
    if total <= 0 {
        return String::new();
    }

    let days = total / SECONDS_PER_DAY;
    let hours = total % SECONDS_PER_DAY / SECONDS_PER_HOUR;
    let minutes = total % SECONDS_PER_HOUR / SECONDS_PER_MINUTE;
    let seconds = total % SECONDS_PER_MINUTE;

    let mut out = String::from("P");
    if days > 0 {
        out.push_str(&format!("{days}D"));
    }
    if hours > 0 || minutes > 0 || seconds > 0 {
        out.push('T');
        if hours > 0 {
            out.push_str(&format!("{hours:02}H"));
        }
        if minutes > 0 {
            out.push_str(&format!("{minutes:02}M"));
        }
        if seconds > 0 {
            out.push_str(&format!("{seconds:02}S"));
        }
    }
    out
}
