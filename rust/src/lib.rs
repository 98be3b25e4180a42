//! Lab work-schedule collision detection and exemption resolution.
//!
//! Recurring weekly schedules are checked for overlaps per user and day, and
//! one-off exemptions are validated against the schedule they modify.

// Allow clippy warning triggered by PyO3 macro expansion
#![allow(clippy::useless_conversion)]

use chrono::{NaiveDate, NaiveTime};
use pyo3::prelude::*;

pub mod collision;
mod config;
pub mod error;
pub mod exemption;
pub mod logging;
mod models;
pub mod service;
pub mod store;
pub mod time;
pub mod week;

pub use collision::{
    check_collision, check_collision_batch, BatchCheck, CollisionReport, CollisionResult,
    DayConflict,
};
pub use config::{BatchPolicy, ResolverConfig};
pub use error::ScheduleError;
pub use exemption::{validate_exemption, ValidationResult};
pub use models::{
    ConflictDescription, ExemptionType, NewScheduleExemption, NewWorkSchedule, ScheduleCandidate,
    ScheduleExemption, WorkSchedule, WORK_SCHEDULE_TYPE,
};
pub use service::{BatchReport, ScheduleRequest, ScheduleService, ServiceError};
pub use store::{InMemoryScheduleStore, ScheduleStore, StoreError};
pub use week::{resolve_week, ResolvedShift, ShiftStatus};

/// Check a candidate schedule against existing schedules.
///
/// # Arguments
/// * `candidate` - Proposed user/lab/day/time range, optionally excluding the entry being edited
/// * `existing_schedules` - Snapshot of stored schedules (other users and days are ignored)
///
/// # Returns
/// * CollisionReport listing every overlapping schedule (empty when clear)
///
/// # Raises
/// * ValueError if the time range is empty or inverted, or the day is not Monday..Friday
#[pyfunction]
#[pyo3(name = "check_collision")]
fn py_check_collision(
    candidate: ScheduleCandidate,
    existing_schedules: Vec<WorkSchedule>,
) -> PyResult<CollisionReport> {
    match check_collision(&candidate, &existing_schedules) {
        Ok(result) => Ok(CollisionReport::from(result)),
        Err(e) => Err(pyo3::exceptions::PyValueError::new_err(e.to_string())),
    }
}

/// Check the same time range on several days.
///
/// # Returns
/// * (accepted_days, [(day, conflicts)]) under the configured batch policy
///
/// # Raises
/// * ValueError on an invalid range, day, or batch policy
#[pyfunction]
#[pyo3(name = "check_collision_days", signature = (candidate, days, existing_schedules, config=None))]
fn py_check_collision_days(
    candidate: ScheduleCandidate,
    days: Vec<u8>,
    existing_schedules: Vec<WorkSchedule>,
    config: Option<ResolverConfig>,
) -> PyResult<(Vec<u8>, Vec<(u8, Vec<ConflictDescription>)>)> {
    let config = config.unwrap_or_default();
    let checked = config.policy().and_then(|policy| {
        check_collision_batch(
            &candidate,
            &days,
            &existing_schedules,
            policy,
            config.verbosity,
        )
    });

    match checked {
        Ok(check) => Ok((
            check.accepted_days,
            check
                .rejected
                .into_iter()
                .map(|day| (day.day_of_week, day.conflicts))
                .collect(),
        )),
        Err(e) => Err(pyo3::exceptions::PyValueError::new_err(e.to_string())),
    }
}

/// Validate a proposed or edited exemption.
///
/// # Arguments
/// * `exemption` - The exemption to check
/// * `parent_schedule` - Schedule it deviates from (not needed for outside-schedule work)
/// * `existing_schedules` - The user's schedules, used to collision-check extra shifts
///
/// # Raises
/// * ValueError naming the first rule the exemption breaks
#[pyfunction]
#[pyo3(name = "validate_exemption", signature = (exemption, parent_schedule=None, existing_schedules=None))]
fn py_validate_exemption(
    exemption: ScheduleExemption,
    parent_schedule: Option<WorkSchedule>,
    existing_schedules: Option<Vec<WorkSchedule>>,
) -> PyResult<()> {
    let existing = existing_schedules.unwrap_or_default();
    match validate_exemption(&exemption, parent_schedule.as_ref(), &existing) {
        Ok(()) => Ok(()),
        Err(e) => Err(pyo3::exceptions::PyValueError::new_err(e.to_string())),
    }
}

/// Resolve the shifts of the week containing `reference_week_start`.
///
/// # Raises
/// * ValueError on an unknown exemption type or out-of-range schedule day
#[pyfunction]
#[pyo3(name = "resolve_week")]
fn py_resolve_week(
    schedules: Vec<WorkSchedule>,
    exemptions: Vec<ScheduleExemption>,
    reference_week_start: NaiveDate,
) -> PyResult<Vec<ResolvedShift>> {
    match resolve_week(&schedules, &exemptions, reference_week_start) {
        Ok(shifts) => Ok(shifts),
        Err(e) => Err(pyo3::exceptions::PyValueError::new_err(e.to_string())),
    }
}

/// Parse an "HH:mm" time-of-day string.
#[pyfunction]
#[pyo3(name = "parse_time_of_day")]
fn py_parse_time_of_day(value: &str) -> PyResult<NaiveTime> {
    match time::parse_time_of_day(value) {
        Ok(parsed) => Ok(parsed),
        Err(e) => Err(pyo3::exceptions::PyValueError::new_err(e.to_string())),
    }
}

/// The labsched.rust Python module.
#[pymodule]
fn rust(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Core data types
    m.add_class::<WorkSchedule>()?;
    m.add_class::<ScheduleExemption>()?;
    m.add_class::<ScheduleCandidate>()?;
    m.add_class::<ConflictDescription>()?;
    m.add_class::<CollisionReport>()?;
    m.add_class::<ResolvedShift>()?;

    // Config types
    m.add_class::<ResolverConfig>()?;

    // Algorithms
    m.add_function(wrap_pyfunction!(py_check_collision, m)?)?;
    m.add_function(wrap_pyfunction!(py_check_collision_days, m)?)?;
    m.add_function(wrap_pyfunction!(py_validate_exemption, m)?)?;
    m.add_function(wrap_pyfunction!(py_resolve_week, m)?)?;
    m.add_function(wrap_pyfunction!(py_parse_time_of_day, m)?)?;

    Ok(())
}
