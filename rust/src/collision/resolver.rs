//! Single-day collision check.

use pyo3::prelude::*;

use crate::error::ScheduleError;
use crate::models::{ConflictDescription, ScheduleCandidate, WorkSchedule};
use crate::time::{validate_day_of_week, TimeInterval};

/// Outcome of checking one candidate against existing schedules.
#[derive(Clone, Debug, PartialEq)]
pub enum CollisionResult {
    NoConflict,
    /// Overlapping schedules, ordered by start time
    Conflicts(Vec<ConflictDescription>),
}

impl CollisionResult {
    pub fn is_clear(&self) -> bool {
        matches!(self, CollisionResult::NoConflict)
    }

    pub fn conflicts(&self) -> &[ConflictDescription] {
        match self {
            CollisionResult::NoConflict => &[],
            CollisionResult::Conflicts(conflicts) => conflicts,
        }
    }

    /// Turn a conflict into a `ScheduleConflict` rejection.
    pub fn into_result(self) -> Result<(), ScheduleError> {
        match self {
            CollisionResult::NoConflict => Ok(()),
            CollisionResult::Conflicts(conflicts) => {
                Err(ScheduleError::ScheduleConflict(conflicts))
            }
        }
    }
}

/// Check a candidate time range against a user's existing schedules.
///
/// Only schedules for the same user and day are compared; the lab is not part of
/// the match key. The schedule named by `exclude_schedule_id` is skipped so an
/// entry being edited never conflicts with itself.
///
/// # Returns
/// * `Ok(CollisionResult::NoConflict)` when nothing overlaps
/// * `Ok(CollisionResult::Conflicts(..))` listing every overlapping schedule
/// * `Err(ScheduleError::InvalidInterval)` if `time_in >= time_out`
/// * `Err(ScheduleError::InvalidDayOfWeek)` if the day is outside Monday..Friday
pub fn check_collision(
    candidate: &ScheduleCandidate,
    existing_schedules: &[WorkSchedule],
) -> Result<CollisionResult, ScheduleError> {
    validate_day_of_week(candidate.day_of_week)?;
    let interval = TimeInterval::new(candidate.time_in, candidate.time_out)?;

    let mut conflicts: Vec<ConflictDescription> = existing_schedules
        .iter()
        .filter(|s| s.user_id == candidate.user_id && s.day_of_week == candidate.day_of_week)
        .filter(|s| candidate.exclude_schedule_id != Some(s.schedule_id))
        .filter(|s| {
            // Stored rows are not re-validated here; an inverted row can never overlap
            interval.overlaps(&TimeInterval {
                start: s.time_in,
                end: s.time_out,
            })
        })
        .map(ConflictDescription::from_schedule)
        .collect();

    if conflicts.is_empty() {
        return Ok(CollisionResult::NoConflict);
    }

    conflicts.sort_by_key(|c| (c.time_in, c.schedule_id));
    Ok(CollisionResult::Conflicts(conflicts))
}

/// Collision outcome as seen from Python.
#[pyclass]
#[derive(Clone, Debug, Default)]
pub struct CollisionReport {
    #[pyo3(get)]
    pub conflicts: Vec<ConflictDescription>,
}

impl From<CollisionResult> for CollisionReport {
    fn from(result: CollisionResult) -> Self {
        match result {
            CollisionResult::NoConflict => Self::default(),
            CollisionResult::Conflicts(conflicts) => Self { conflicts },
        }
    }
}

#[pymethods]
impl CollisionReport {
    #[getter]
    fn has_conflict(&self) -> bool {
        !self.conflicts.is_empty()
    }

    fn __repr__(&self) -> String {
        format!("CollisionReport(conflicts={})", self.conflicts.len())
    }
}
