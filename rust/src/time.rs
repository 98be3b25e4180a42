//! Time-of-day and calendar-week helpers.
//!
//! Schedules are recurring weekly entries keyed by a day index (0=Monday..4=Friday)
//! and a time-of-day range. Anything that needs an absolute calendar date takes an
//! explicit reference week start instead of reading a "current week".

use chrono::{Datelike, Days, NaiveDate, NaiveTime};

use crate::error::ScheduleError;

/// Transport format for time-of-day values.
pub const TIME_FORMAT: &str = "%H:%M";

/// Last schedulable day index (Friday). Weekends are not modeled.
pub const MAX_DAY_OF_WEEK: u8 = 4;

const DAY_NAMES: [&str; 5] = ["Monday", "Tuesday", "Wednesday", "Thursday", "Friday"];

/// Parse an "HH:mm" (or "HH:mm:ss") string into a time of day.
pub fn parse_time_of_day(value: &str) -> Result<NaiveTime, ScheduleError> {
    let trimmed = value.trim();
    NaiveTime::parse_from_str(trimmed, TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
        .map_err(|_| ScheduleError::InvalidTimeFormat(value.to_string()))
}

/// Format a time of day as "HH:mm".
pub fn format_time_of_day(time: NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

/// Half-open time-of-day interval `[start, end)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeInterval {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeInterval {
    /// Build an interval, rejecting zero-length and inverted ranges.
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self, ScheduleError> {
        if start >= end {
            return Err(ScheduleError::InvalidInterval {
                time_in: start,
                time_out: end,
            });
        }
        Ok(Self { start, end })
    }

    /// Two half-open intervals overlap iff each starts before the other ends.
    ///
    /// Abutting intervals (`a.end == b.start`) do not overlap.
    #[inline]
    pub fn overlaps(&self, other: &TimeInterval) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Check whether `other` lies entirely within this interval.
    #[inline]
    pub fn contains(&self, other: &TimeInterval) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// Reject day indices outside Monday..Friday.
pub fn validate_day_of_week(day_of_week: u8) -> Result<u8, ScheduleError> {
    if day_of_week > MAX_DAY_OF_WEEK {
        return Err(ScheduleError::InvalidDayOfWeek(day_of_week));
    }
    Ok(day_of_week)
}

/// Day index of a date (0=Monday..4=Friday), or `None` on weekends.
pub fn weekday_index(date: NaiveDate) -> Option<u8> {
    let index = date.weekday().num_days_from_monday() as u8;
    (index <= MAX_DAY_OF_WEEK).then_some(index)
}

/// Monday of the ISO week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    let offset = date.weekday().num_days_from_monday() as u64;
    date.checked_sub_days(Days::new(offset)).unwrap_or(date)
}

/// Absolute date of a recurring day index in the week containing `reference_week_start`.
pub fn date_for_day(
    reference_week_start: NaiveDate,
    day_of_week: u8,
) -> Result<NaiveDate, ScheduleError> {
    let day = validate_day_of_week(day_of_week)?;
    let monday = week_start(reference_week_start);
    Ok(monday
        .checked_add_days(Days::new(day as u64))
        .unwrap_or(monday))
}

/// Display name for a day index.
pub fn day_name(day_of_week: u8) -> &'static str {
    DAY_NAMES
        .get(day_of_week as usize)
        .copied()
        .unwrap_or("Unknown day")
}
