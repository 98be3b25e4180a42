//! Exemption bounds validation.
//!
//! An exemption records a one-off deviation (calling out, arriving late, leaving
//! early, covering another room, or an extra unscheduled shift) without touching
//! the recurring schedule. Checks run in a fixed order and stop at the first failure:
//!
//! 1. start and end fall on the same calendar day
//! 2. start and end differ
//! 3. the day is Monday..Friday
//! 4. the start comes before the end
//! 5. extra shifts must not collide with the user's schedules; every other type
//!    must belong to the same user and day as the schedule it deviates from and
//!    fit inside it

use chrono::Datelike;

use crate::collision::check_collision;
use crate::error::ScheduleError;
use crate::models::{ScheduleCandidate, ScheduleExemption, WorkSchedule};
use crate::time::{weekday_index, TimeInterval};

/// Validation result: `Ok(())` means the caller may persist the exemption.
pub type ValidationResult = Result<(), ScheduleError>;

/// Validate a proposed or edited exemption.
///
/// # Arguments
/// * `exemption` - The exemption to check
/// * `parent_schedule` - Schedule the exemption deviates from (required unless the
///   type is `WorkingOutsideSchedule`)
/// * `existing_schedules` - The user's schedules, used to collision-check extra shifts
pub fn validate_exemption(
    exemption: &ScheduleExemption,
    parent_schedule: Option<&WorkSchedule>,
    existing_schedules: &[WorkSchedule],
) -> ValidationResult {
    let date = exemption.start_date.date();
    if date != exemption.end_date.date() {
        return Err(ScheduleError::CrossDayExemption);
    }
    if exemption.start_date == exemption.end_date {
        return Err(ScheduleError::ZeroLengthExemption);
    }
    let day_of_week = weekday_index(date).ok_or(ScheduleError::NonWorkday(date.weekday()))?;
    let window = TimeInterval::new(exemption.start_date.time(), exemption.end_date.time())?;

    let kind = exemption.exemption_type()?;
    if !kind.has_parent_schedule() {
        let candidate = ScheduleCandidate {
            user_id: exemption.user_id,
            lab_id: exemption.lab_id,
            time_in: window.start,
            time_out: window.end,
            day_of_week,
            exclude_schedule_id: None,
        };
        return check_collision(&candidate, existing_schedules)?.into_result();
    }

    let parent = parent_schedule.ok_or(ScheduleError::MissingParentSchedule(kind.id()))?;
    if let Some(expected) = exemption.fk_schedule {
        if expected != parent.schedule_id {
            return Err(ScheduleError::ParentScheduleMismatch {
                expected,
                found: parent.schedule_id,
            });
        }
    }
    if parent.user_id != exemption.user_id {
        return Err(ScheduleError::ParentUserMismatch {
            exemption_user: exemption.user_id,
            schedule_user: parent.user_id,
        });
    }
    if parent.day_of_week != day_of_week {
        return Err(ScheduleError::WrongScheduleDay {
            exemption_day: day_of_week,
            schedule_day: parent.day_of_week,
        });
    }

    let shift = parent.interval()?;
    if shift.contains(&window) {
        Ok(())
    } else if window.start < shift.start {
        Err(ScheduleError::BeforeScheduleStart {
            start: window.start,
            time_in: shift.start,
        })
    } else {
        Err(ScheduleError::AfterScheduleEnd {
            end: window.end,
            time_out: shift.end,
        })
    }
}
