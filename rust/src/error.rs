//! Rejection reasons for schedule and exemption checks.

use chrono::{NaiveTime, Weekday};
use thiserror::Error;

use crate::models::ConflictDescription;
use crate::time::format_time_of_day;

/// Errors returned by the collision resolver and the exemption validator.
///
/// Every variant is recoverable: the user corrects the input and resubmits.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScheduleError {
    #[error("Invalid time range: {} must be before {}", hm(.time_in), hm(.time_out))]
    InvalidInterval {
        time_in: NaiveTime,
        time_out: NaiveTime,
    },
    #[error("Schedule conflicts with {}", format_conflicts(.0))]
    ScheduleConflict(Vec<ConflictDescription>),
    #[error("Exemption must start and end on the same day")]
    CrossDayExemption,
    #[error("Exemption start and end cannot be the same")]
    ZeroLengthExemption,
    #[error("Exemption falls on {0}, which is not a workday")]
    NonWorkday(Weekday),
    #[error("Exemption starts at {}, before the schedule starts at {}", hm(.start), hm(.time_in))]
    BeforeScheduleStart { start: NaiveTime, time_in: NaiveTime },
    #[error("Exemption ends at {}, after the schedule ends at {}", hm(.end), hm(.time_out))]
    AfterScheduleEnd { end: NaiveTime, time_out: NaiveTime },
    #[error("Exemption type {0} requires the schedule it deviates from")]
    MissingParentSchedule(i32),
    #[error("Exemption references schedule #{expected}, but schedule #{found} was supplied")]
    ParentScheduleMismatch { expected: i64, found: i64 },
    #[error("Exemption is for user {exemption_user}, but the schedule belongs to user {schedule_user}")]
    ParentUserMismatch {
        exemption_user: i64,
        schedule_user: i64,
    },
    #[error("Exemption falls on day {exemption_day}, but its schedule is on day {schedule_day}")]
    WrongScheduleDay { exemption_day: u8, schedule_day: u8 },
    #[error("Schedule request names no days")]
    NoDaysRequested,
    #[error("Invalid day of week: {0} (expected 0=Monday..4=Friday)")]
    InvalidDayOfWeek(u8),
    #[error("Invalid time of day: {0:?} (expected HH:mm)")]
    InvalidTimeFormat(String),
    #[error("Unknown exemption type: {0}")]
    UnknownExemptionType(i32),
    #[error("Unknown batch policy: {0}")]
    UnknownBatchPolicy(String),
}

fn hm(time: &NaiveTime) -> String {
    format_time_of_day(*time)
}

fn format_conflicts(conflicts: &[ConflictDescription]) -> String {
    conflicts
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl ScheduleError {
    /// Conflicting schedules, if this is a conflict rejection.
    pub fn conflicts(&self) -> &[ConflictDescription] {
        match self {
            ScheduleError::ScheduleConflict(conflicts) => conflicts,
            _ => &[],
        }
    }
}
