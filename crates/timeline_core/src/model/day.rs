//! Selected timeline day.
//!
//! A day is a calendar date plus the local UTC offset that defines its
//! midnight. All spans are measured from that midnight.

use super::validation::ValidationError;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Offset, TimeDelta, TimeZone, Utc};

const MAX_OFFSET_MINUTES: i32 = 18 * 60;
const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// # Invariants
/// - `start` and `end` are representable instants, checked on construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineDay {
    date: NaiveDate,
    utc_offset: FixedOffset,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimelineDay {
    /// Fails with `DayOutOfRange` when either midnight of the day falls
    /// outside chrono's range.
    pub fn new(date: NaiveDate, utc_offset: FixedOffset) -> Result<Self, ValidationError> {
        let offset = TimeDelta::seconds(i64::from(utc_offset.local_minus_utc()));
        let start = date
            .and_time(NaiveTime::MIN)
            .checked_sub_signed(offset)
            .map(|utc_midnight| Utc.from_utc_datetime(&utc_midnight))
            .ok_or(ValidationError::DayOutOfRange(date))?;
        let end = start
            .checked_add_signed(TimeDelta::seconds(SECONDS_PER_DAY))
            .ok_or(ValidationError::DayOutOfRange(date))?;
        Ok(Self {
            date,
            utc_offset,
            start,
            end,
        })
    }

    /// Day whose midnight is UTC midnight.
    pub fn utc(date: NaiveDate) -> Result<Self, ValidationError> {
        Self::new(date, Utc.fix())
    }

    /// Day with an offset expressed in minutes east of UTC.
    pub fn with_offset_minutes(date: NaiveDate, minutes: i32) -> Result<Self, ValidationError> {
        Self::new(date, offset_from_minutes(minutes)?)
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn utc_offset(&self) -> FixedOffset {
        self.utc_offset
    }

    /// Local midnight as a UTC instant.
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Exclusive end of the day (next local midnight) as a UTC instant.
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Whole seconds from local midnight to `instant`; negative before the day.
    pub fn seconds_since_midnight(&self, instant: DateTime<Utc>) -> i64 {
        instant.signed_duration_since(self.start).num_seconds()
    }
}

/// Converts minutes east of UTC into an offset, rejecting anything beyond
/// ±18h.
pub fn offset_from_minutes(minutes: i32) -> Result<FixedOffset, ValidationError> {
    if minutes.abs() > MAX_OFFSET_MINUTES {
        return Err(ValidationError::InvalidUtcOffset { minutes });
    }
    FixedOffset::east_opt(minutes * 60).ok_or(ValidationError::InvalidUtcOffset { minutes })
}
