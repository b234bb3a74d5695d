//! Browser timestamp encodings
//!
//! Chromium: decimal string of microseconds since 1601-01-01 UTC.
//! Firefox: integer microseconds since the Unix epoch.

use chrono::{DateTime, Utc};

/// Microseconds between 1601-01-01 and 1970-01-01
const WINDOWS_EPOCH_DELTA_US: i64 = 11_644_473_600 * 1_000_000;

/// Parse a Chromium timestamp; `None` for "0", empty or garbage
pub fn from_chrome(raw: &str) -> Option<DateTime<Utc>> {
    let micros: i64 = raw.trim().parse().ok()?;
    if micros <= 0 {
        return None;
    }
    DateTime::from_timestamp_micros(micros - WINDOWS_EPOCH_DELTA_US)
}

pub fn to_chrome(value: DateTime<Utc>) -> String {
    (value.timestamp_micros() + WINDOWS_EPOCH_DELTA_US).to_string()
}

pub fn from_firefox(micros: Option<i64>) -> Option<DateTime<Utc>> {
    micros
        .filter(|m| *m > 0)
        .and_then(DateTime::from_timestamp_micros)
}

pub fn to_firefox(value: DateTime<Utc>) -> i64 {
    value.timestamp_micros()
}
