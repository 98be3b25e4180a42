//! Multi-day collision check for weekly schedules created across several days at once.

use crate::config::BatchPolicy;
use crate::error::ScheduleError;
use crate::models::{ConflictDescription, ScheduleCandidate, WorkSchedule};
use crate::time::{validate_day_of_week, TimeInterval};
use crate::{log_checks, log_debug};

use super::resolver::{check_collision, CollisionResult};

/// Conflicts found on one requested day.
#[derive(Clone, Debug, PartialEq)]
pub struct DayConflict {
    pub day_of_week: u8,
    pub conflicts: Vec<ConflictDescription>,
}

/// Outcome of a multi-day check.
#[derive(Clone, Debug, PartialEq)]
pub struct BatchCheck {
    pub policy: BatchPolicy,
    /// Days that may be written, ascending
    pub accepted_days: Vec<u8>,
    /// Days that collided, ascending
    pub rejected: Vec<DayConflict>,
}

impl BatchCheck {
    pub fn is_clear(&self) -> bool {
        self.rejected.is_empty()
    }

    /// Every conflict across all rejected days.
    pub fn all_conflicts(&self) -> Vec<ConflictDescription> {
        self.rejected
            .iter()
            .flat_map(|day| day.conflicts.iter().cloned())
            .collect()
    }
}

/// Check the same time range on each of several days.
///
/// Each day is checked independently against `existing_schedules`. Under
/// `AllOrNothing` a single conflicting day leaves `accepted_days` empty; under
/// `BestEffort` every clear day is accepted. Repeated days are checked once.
///
/// The `day_of_week` of `template` is ignored in favor of `days`.
pub fn check_collision_batch(
    template: &ScheduleCandidate,
    days: &[u8],
    existing_schedules: &[WorkSchedule],
    policy: BatchPolicy,
    verbosity: u8,
) -> Result<BatchCheck, ScheduleError> {
    // Reject malformed input before reporting any per-day result
    if days.is_empty() {
        return Err(ScheduleError::NoDaysRequested);
    }
    TimeInterval::new(template.time_in, template.time_out)?;
    let mut days: Vec<u8> = days
        .iter()
        .map(|&day| validate_day_of_week(day))
        .collect::<Result<_, _>>()?;
    days.sort_unstable();
    days.dedup();

    log_debug!(
        verbosity,
        "Batch check for user {} on days {:?} against {} schedules",
        template.user_id,
        days,
        existing_schedules.len()
    );

    let mut accepted_days = Vec::with_capacity(days.len());
    let mut rejected = Vec::new();

    for day in days {
        let candidate = ScheduleCandidate {
            day_of_week: day,
            ..template.clone()
        };
        match check_collision(&candidate, existing_schedules)? {
            CollisionResult::NoConflict => {
                log_checks!(verbosity, "  Day {}: clear", day);
                accepted_days.push(day);
            }
            CollisionResult::Conflicts(conflicts) => {
                log_checks!(verbosity, "  Day {}: {} conflict(s)", day, conflicts.len());
                rejected.push(DayConflict {
                    day_of_week: day,
                    conflicts,
                });
            }
        }
    }

    if policy == BatchPolicy::AllOrNothing && !rejected.is_empty() {
        accepted_days.clear();
    }

    Ok(BatchCheck {
        policy,
        accepted_days,
        rejected,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WORK_SCHEDULE_TYPE;
    use chrono::NaiveTime;

    fn t(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
    }

    fn schedule(id: i64, day: u8, time_in: NaiveTime, time_out: NaiveTime) -> WorkSchedule {
        WorkSchedule {
            schedule_id: id,
            user_id: 1,
            lab_id: 1,
            day_of_week: day,
            time_in,
            time_out,
            schedule_type_id: WORK_SCHEDULE_TYPE,
            location: None,
        }
    }

    fn template(time_in: NaiveTime, time_out: NaiveTime) -> ScheduleCandidate {
        ScheduleCandidate {
            user_id: 1,
            lab_id: 2,
            time_in,
            time_out,
            day_of_week: 0,
            exclude_schedule_id: None,
        }
    }

    #[test]
    fn test_all_days_clear() {
        let check = check_collision_batch(
            &template(t(9, 0), t(12, 0)),
            &[0, 2, 4],
            &[],
            BatchPolicy::AllOrNothing,
            0,
        )
        .unwrap();
        assert!(check.is_clear());
        assert_eq!(check.accepted_days, vec![0, 2, 4]);
    }

    #[test]
    fn test_all_or_nothing_rejects_whole_batch() {
        let existing = vec![schedule(1, 2, t(10, 0), t(11, 0))];
        let check = check_collision_batch(
            &template(t(9, 0), t(12, 0)),
            &[0, 2, 4],
            &existing,
            BatchPolicy::AllOrNothing,
            0,
        )
        .unwrap();
        assert!(check.accepted_days.is_empty());
        assert_eq!(check.rejected.len(), 1);
        assert_eq!(check.rejected[0].day_of_week, 2);
        assert_eq!(check.all_conflicts()[0].schedule_id, 1);
    }

    #[test]
    fn test_best_effort_keeps_clear_days() {
        let existing = vec![schedule(1, 2, t(10, 0), t(11, 0))];
        let check = check_collision_batch(
            &template(t(9, 0), t(12, 0)),
            &[4, 0, 2],
            &existing,
            BatchPolicy::BestEffort,
            0,
        )
        .unwrap();
        assert_eq!(check.accepted_days, vec![0, 4]);
        assert_eq!(check.rejected[0].day_of_week, 2);
    }

    #[test]
    fn test_conflict_on_first_day_does_not_hide_later_days() {
        let existing = vec![
            schedule(1, 0, t(9, 0), t(10, 0)),
            schedule(2, 3, t(11, 0), t(13, 0)),
        ];
        let check = check_collision_batch(
            &template(t(9, 0), t(12, 0)),
            &[0, 1, 3],
            &existing,
            BatchPolicy::BestEffort,
            0,
        )
        .unwrap();
        assert_eq!(check.accepted_days, vec![1]);
        let rejected_days: Vec<u8> = check.rejected.iter().map(|r| r.day_of_week).collect();
        assert_eq!(rejected_days, vec![0, 3]);
    }

    #[test]
    fn test_repeated_days_checked_once() {
        let check = check_collision_batch(
            &template(t(9, 0), t(12, 0)),
            &[1, 1, 1],
            &[],
            BatchPolicy::BestEffort,
            0,
        )
        .unwrap();
        assert_eq!(check.accepted_days, vec![1]);
    }

    #[test]
    fn test_invalid_input_rejected_up_front() {
        assert_eq!(
            check_collision_batch(
                &template(t(9, 0), t(12, 0)),
                &[0, 6],
                &[],
                BatchPolicy::BestEffort,
                0
            ),
            Err(ScheduleError::InvalidDayOfWeek(6))
        );
        assert_eq!(
            check_collision_batch(
                &template(t(9, 0), t(12, 0)),
                &[],
                &[],
                BatchPolicy::AllOrNothing,
                0
            ),
            Err(ScheduleError::NoDaysRequested)
        );
        assert!(matches!(
            check_collision_batch(
                &template(t(12, 0), t(9, 0)),
                &[0],
                &[],
                BatchPolicy::BestEffort,
                0
            ),
            Err(ScheduleError::InvalidInterval { .. })
        ));
    }
}
