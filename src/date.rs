//! Conversion of HTTP `Expires` headers into expiration timestamps.
//!
//! HTTP/1.1 requires clients to accept three date formats:
//!
//! * RFC 1123: `Sun, 06 Nov 1994 08:49:37 GMT`
//! * RFC 850: `Sunday, 06-Nov-94 08:49:37 GMT`
//! * asctime: `Sun Nov  6 08:49:37 1994`
//!
//! Day and month names are always English and always capitalized, no matter
//! what the host locale says.

use chrono::{DateTime, Datelike, TimeZone, Utc};
use thiserror::Error;
use tracing::debug;

const SHORT_WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
const LONG_WEEKDAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum DateParseError {
    #[error("{0:?} is not an English day name")]
    Weekday(String),

    #[error("{0:?} is not an RFC 1123, RFC 850 or asctime date")]
    Format(String),
}

/// Parse an HTTP date in any of the three formats. Two-digit RFC 850 years
/// are placed in the century of `reference`. In every format the day name
/// has to agree with the date.
pub(crate) fn parse_http_date(
    value: &str,
    reference: DateTime<Utc>,
) -> Result<DateTime<Utc>, DateParseError> {
    let value = value.trim();
    let value = match value.split_once(", ") {
        // Only RFC 850 spells the day name out in full.
        Some((weekday, rest)) if weekday.len() > 3 => {
            rfc850_to_rfc1123(weekday, rest, reference.year())?
        }
        _ => value.to_string(),
    };

    httpdate::parse_http_date(&value)
        .map(DateTime::<Utc>::from)
        .map_err(|_| DateParseError::Format(value))
}

/// `httpdate` puts two-digit years in 1970-2069. Rewriting the date with a
/// four-digit year in the reference century sidesteps that.
fn rfc850_to_rfc1123(
    weekday: &str,
    rest: &str,
    reference_year: i32,
) -> Result<String, DateParseError> {
    let short = LONG_WEEKDAYS
        .iter()
        .position(|day| *day == weekday)
        .map(|at| SHORT_WEEKDAYS[at])
        .ok_or_else(|| DateParseError::Weekday(weekday.to_string()))?;

    let malformed = || DateParseError::Format(format!("{}, {}", weekday, rest));

    // 06-Nov-94 08:49:37 GMT
    let (date, time) = rest.split_once(' ').ok_or_else(malformed)?;
    let mut parts = date.splitn(3, '-');
    let (day, month, year) = match (parts.next(), parts.next(), parts.next()) {
        (Some(day), Some(month), Some(year)) if year.len() == 2 => (day, month, year),
        _ => return Err(malformed()),
    };
    let year: i32 = year.parse().map_err(|_| malformed())?;
    let century = reference_year.div_euclid(100) * 100;

    Ok(format!("{}, {} {} {} {}", short, day, month, century + year, time))
}

/// Read a UTC instant as epoch seconds in the requested frame. The local
/// frame is the host's wall clock read as if it were UTC.
pub(crate) fn to_epoch(instant: DateTime<Utc>, use_local_time: bool) -> i64 {
    if use_local_time {
        let local = instant.with_timezone(&chrono::Local).naive_local();
        Utc.from_utc_datetime(&local).timestamp()
    } else {
        instant.timestamp()
    }
}

/// Work out when a document fetched at `fetched_at` expires.
///
/// `fetched_at` is epoch seconds in the frame selected by `use_local_time`,
/// and so is the result. A missing or unparseable `Expires` header yields
/// `fetched_at + default_secs`; this function never fails.
pub fn expiration_from_header(
    header: Option<&str>,
    fetched_at: i64,
    default_secs: i64,
    use_local_time: bool,
) -> i64 {
    let fallback = fetched_at.saturating_add(default_secs);
    let header = match header {
        Some(header) => header,
        None => return fallback,
    };

    let reference = Utc
        .timestamp_opt(fetched_at, 0)
        .single()
        .unwrap_or_else(Utc::now);

    match parse_http_date(header, reference) {
        Ok(expires) => to_epoch(expires, use_local_time),
        Err(err) => {
            debug!(header, error = %err, "ignoring unparseable Expires header");
            fallback
        }
    }
}
