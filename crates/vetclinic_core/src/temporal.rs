//! Appointment date-time normalization.
//!
//! # Responsibility
//! - Parse and format appointment date-times in the fixed wire pattern
//!   `DD-MM-YYYY HH:mm`.
//! - Reduce date-times to calendar dates for day-level filtering.
//!
//! # Invariants
//! - Parsing rejects anything that is not exactly the wire pattern, and any
//!   calendar-impossible value (`31-02-2025 10:00`).
//! - `parse(format(dt)) == dt` for every minute-precision date-time.
//! - No time-zone model exists; all values are naive local date-times.
//! - The wire pattern has a four-digit year, so the supported domain is years
//!   0000 through 9999.

use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Human-readable wire pattern for appointment date-times.
pub const DATE_TIME_PATTERN: &str = "DD-MM-YYYY HH:mm";
/// Human-readable wire pattern for calendar-date filters.
pub const DATE_PATTERN: &str = "DD-MM-YYYY";

const DATE_TIME_FORMAT: &str = "%d-%m-%Y %H:%M";
const DATE_FORMAT: &str = "%d-%m-%Y";

// chrono accepts single-digit fields for `%d`/`%H`; the shape check keeps the
// wire format fixed-width.
static DATE_TIME_SHAPE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{2}-\d{2}-\d{4} \d{2}:\d{2}$").expect("valid date-time shape regex")
});
static DATE_SHAPE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{2}-\d{2}-\d{4}$").expect("valid date shape regex"));

/// Error raised when date/date-time text does not match the wire pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemporalError {
    InvalidFormat {
        input: String,
        expected: &'static str,
    },
}

impl Display for TemporalError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidFormat { input, expected } => {
                write!(f, "invalid date value `{input}`; expected {expected}")
            }
        }
    }
}

impl Error for TemporalError {}

pub type TemporalResult<T> = Result<T, TemporalError>;

/// Parses `DD-MM-YYYY HH:mm` text into a naive date-time.
///
/// Surrounding whitespace is ignored. Seconds are always zero. Years are
/// exactly four digits (0000-9999).
pub fn parse(text: &str) -> TemporalResult<NaiveDateTime> {
    let trimmed = text.trim();
    if !DATE_TIME_SHAPE_RE.is_match(trimmed) {
        return Err(invalid(trimmed, DATE_TIME_PATTERN));
    }
    NaiveDateTime::parse_from_str(trimmed, DATE_TIME_FORMAT)
        .map_err(|_| invalid(trimmed, DATE_TIME_PATTERN))
}

/// Formats a date-time in the `DD-MM-YYYY HH:mm` wire pattern.
///
/// Only years 0000-9999 render in a form `parse` accepts back.
pub fn format(value: &NaiveDateTime) -> String {
    value.format(DATE_TIME_FORMAT).to_string()
}

/// Parses `DD-MM-YYYY` text into a calendar date.
pub fn parse_date(text: &str) -> TemporalResult<NaiveDate> {
    let trimmed = text.trim();
    if !DATE_SHAPE_RE.is_match(trimmed) {
        return Err(invalid(trimmed, DATE_PATTERN));
    }
    NaiveDate::parse_from_str(trimmed, DATE_FORMAT).map_err(|_| invalid(trimmed, DATE_PATTERN))
}

/// Formats a calendar date in the `DD-MM-YYYY` wire pattern.
pub fn format_date(value: &NaiveDate) -> String {
    value.format(DATE_FORMAT).to_string()
}

/// Drops the time-of-day portion.
pub fn extract_calendar_date(value: &NaiveDateTime) -> NaiveDate {
    value.date()
}

fn invalid(input: &str, expected: &'static str) -> TemporalError {
    TemporalError::InvalidFormat {
        input: input.to_string(),
        expected,
    }
}

/// Serde adapter that writes date-times in the wire pattern.
///
/// Use with `#[serde(with = "crate::temporal::wire")]`.
pub mod wire {
    use chrono::NaiveDateTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let text = String::deserialize(deserializer)?;
        super::parse(&text).map_err(de::Error::custom)
    }
}
