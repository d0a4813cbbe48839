use jiff::civil::DateTime;
use jiff::tz::TimeZone;
use thiserror::Error;

use crate::Time;

#[derive(Error, Debug)]
#[error("cannot parse timestamp: {0}")]
pub struct TimestampError(#[from] jiff::Error);

/// Seconds since the Unix epoch for a timezone-naive civil datetime, read
/// as UTC. This is the canonical zero-based offset the core computes in when
/// the host supplies absolute timestamps instead of plain relative seconds.
pub fn datetime_seconds(datetime: DateTime) -> Result<Time, TimestampError> {
    let zoned = datetime.to_zoned(TimeZone::UTC)?;
    Ok(zoned.timestamp().as_second() as Time)
}

/// Parses a civil datetime string (e.g. `2026-08-07T08:00:00`) into
/// canonical seconds.
pub fn parse_datetime(text: &str) -> Result<Time, TimestampError> {
    let datetime: DateTime = text.parse()?;
    datetime_seconds(datetime)
}

/// Rebases absolute seconds so the earliest instant becomes zero. Windows
/// and execution dates shifted together keep their relative meaning, and the
/// solver's schedules stay in small numbers.
pub fn rebase_to_zero(values: &mut [i64]) -> i64 {
    let Some(&base) = values.iter().min() else {
        return 0;
    };
    for value in values.iter_mut() {
        *value -= base;
    }
    base
}
