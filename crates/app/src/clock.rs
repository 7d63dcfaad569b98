use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use thiserror::Error;

/// Injectable source of the current instant.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(Utc::now)
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid timezone: {0}")]
pub struct InvalidTimezone(pub String);

/// Parses an IANA timezone name.
pub fn parse_timezone(timezone: &str) -> Result<Tz, InvalidTimezone> {
    timezone
        .parse()
        .map_err(|_| InvalidTimezone(timezone.to_string()))
}

/// Calendar date of `now` as observed in `timezone`.
pub fn local_today(now: DateTime<Utc>, timezone: &str) -> Result<NaiveDate, InvalidTimezone> {
    let tz = parse_timezone(timezone)?;
    Ok(now.with_timezone(&tz).date_naive())
}
