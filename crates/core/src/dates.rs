use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

/// Canonical storage and wire format for calendar dates.
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

/// Raised when a date string cannot be interpreted as a calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid date '{value}': expected YYYY-MM-DD or an RFC 3339 timestamp")]
pub struct InvalidDateError {
    pub value: String,
}

/// Parses an ISO date.
///
/// Accepts a plain `YYYY-MM-DD` date or a full RFC 3339 timestamp, in which
/// case the UTC calendar date of the instant is returned.
pub fn parse_iso_date(value: &str) -> Result<NaiveDate, InvalidDateError> {
    let trimmed = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, ISO_DATE_FORMAT) {
        return Ok(date);
    }

    DateTime::parse_from_rfc3339(trimmed)
        .map(|timestamp| timestamp.with_timezone(&Utc).date_naive())
        .map_err(|_| InvalidDateError {
            value: value.to_string(),
        })
}

/// Parses an optional ISO date, treating `None` and blank strings as absent.
pub fn parse_optional_iso_date(value: Option<&str>) -> Result<Option<NaiveDate>, InvalidDateError> {
    match value {
        Some(raw) if !raw.trim().is_empty() => parse_iso_date(raw).map(Some),
        _ => Ok(None),
    }
}

/// Formats a date in the canonical `YYYY-MM-DD` form.
pub fn format_iso_date(date: NaiveDate) -> String {
    date.format(ISO_DATE_FORMAT).to_string()
}
