//! # Time Utilities
//!
//! Utilities for time formatting and manipulation using chrono.
//!
//! All timestamps leaving the service use the same shape: UTC, microsecond
//! precision, literal `Z` suffix (e.g. `2024-05-01T12:30:45.123456Z`).

use chrono::{DateTime, SubsecRound, Utc};

/// Wire format for timestamps.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

/// Get current UTC time, truncated to microseconds so stored and formatted values agree.
pub fn now_utc() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Format time as ISO-8601 with microseconds and a literal `Z`.
pub fn format_time(time: DateTime<Utc>) -> String {
    time.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse RFC3339 string to UTC DateTime.
pub fn parse_utc(moment: &str) -> Result<DateTime<Utc>, Error> {
    DateTime::parse_from_rfc3339(moment)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| Error::FailToDateParse(moment.to_string()))
}

// region:    --- Error
#[derive(Debug)]
pub enum Error {
    FailToDateParse(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(fmt, "{self:?}")
    }
}

impl std::error::Error for Error {}
// endregion: --- Error

// endregion: --- Tests
