//! Week resolution: recurring schedules plus that week's exemptions as dated shifts.

use chrono::{Days, NaiveDate, NaiveDateTime};
use pyo3::prelude::*;
use rustc_hash::FxHashMap;

use crate::error::ScheduleError;
use crate::models::{ExemptionType, ScheduleExemption, WorkSchedule};
use crate::time::{date_for_day, week_start};

/// What happens to a shift on its date.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShiftStatus {
    Scheduled,
    CalledOut,
    Late,
    WorkingInNewRoom,
    OutsideSchedule,
    LeavingEarly,
}

impl ShiftStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ShiftStatus::Scheduled => "scheduled",
            ShiftStatus::CalledOut => "called_out",
            ShiftStatus::Late => "late",
            ShiftStatus::WorkingInNewRoom => "working_in_new_room",
            ShiftStatus::OutsideSchedule => "outside_schedule",
            ShiftStatus::LeavingEarly => "leaving_early",
        }
    }
}

impl From<ExemptionType> for ShiftStatus {
    fn from(kind: ExemptionType) -> Self {
        match kind {
            ExemptionType::CallingOut => ShiftStatus::CalledOut,
            ExemptionType::Late => ShiftStatus::Late,
            ExemptionType::WorkingInNewRoom => ShiftStatus::WorkingInNewRoom,
            ExemptionType::WorkingOutsideSchedule => ShiftStatus::OutsideSchedule,
            ExemptionType::LeavingEarly => ShiftStatus::LeavingEarly,
        }
    }
}

/// A concrete, dated shift for one user.
#[pyclass]
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedShift {
    #[pyo3(get)]
    pub user_id: i64,
    #[pyo3(get)]
    pub lab_id: i64,
    #[pyo3(get)]
    pub start: NaiveDateTime,
    #[pyo3(get)]
    pub end: NaiveDateTime,
    #[pyo3(get)]
    pub schedule_id: Option<i64>,
    #[pyo3(get)]
    pub schedule_exemption_id: Option<i64>,
    /// Always true for unmodified shifts
    #[pyo3(get)]
    pub verified: bool,
    pub status: ShiftStatus,
}

impl ResolvedShift {
    fn from_schedule(schedule: &WorkSchedule, date: NaiveDate) -> Self {
        Self {
            user_id: schedule.user_id,
            lab_id: schedule.lab_id,
            start: date.and_time(schedule.time_in),
            end: date.and_time(schedule.time_out),
            schedule_id: Some(schedule.schedule_id),
            schedule_exemption_id: None,
            verified: true,
            status: ShiftStatus::Scheduled,
        }
    }

    fn from_exemption(exemption: &ScheduleExemption, kind: ExemptionType) -> Self {
        Self {
            user_id: exemption.user_id,
            lab_id: exemption.lab_id,
            start: exemption.start_date,
            end: exemption.end_date,
            schedule_id: exemption.fk_schedule,
            schedule_exemption_id: Some(exemption.schedule_exemption_id),
            verified: exemption.verified,
            status: ShiftStatus::from(kind),
        }
    }
}

#[pymethods]
impl ResolvedShift {
    #[getter(status)]
    fn status_name(&self) -> &'static str {
        self.status.as_str()
    }

    fn __repr__(&self) -> String {
        format!(
            "ResolvedShift(user_id={}, lab_id={}, {} - {}, status={})",
            self.user_id,
            self.lab_id,
            self.start,
            self.end,
            self.status.as_str()
        )
    }
}

/// Resolve one calendar week of shifts.
///
/// Each recurring schedule becomes a dated shift in the week containing
/// `reference_week_start`. Exemptions dated in that week replace the shift they
/// reference on that date: the shift takes the exemption's window, lab and status
/// (a calling-out exemption keeps its window but is marked called out). Extra
/// shifts outside the schedule are added as their own entries, as are exemptions
/// whose schedule is not in `schedules`.
///
/// Output is ordered by start, then user.
pub fn resolve_week(
    schedules: &[WorkSchedule],
    exemptions: &[ScheduleExemption],
    reference_week_start: NaiveDate,
) -> Result<Vec<ResolvedShift>, ScheduleError> {
    let monday = week_start(reference_week_start);
    let next_monday = monday.checked_add_days(Days::new(7)).unwrap_or(monday);

    // (schedule_id, date) -> exemptions replacing that shift
    let mut replacements: FxHashMap<(i64, NaiveDate), Vec<(&ScheduleExemption, ExemptionType)>> =
        FxHashMap::default();
    let mut shifts: Vec<ResolvedShift> = Vec::new();

    for exemption in exemptions {
        let date = exemption.date();
        if date < monday || date >= next_monday {
            continue;
        }
        let kind = exemption.exemption_type()?;
        match (kind.has_parent_schedule(), exemption.fk_schedule) {
            (true, Some(schedule_id)) => replacements
                .entry((schedule_id, date))
                .or_default()
                .push((exemption, kind)),
            _ => shifts.push(ResolvedShift::from_exemption(exemption, kind)),
        }
    }

    for schedule in schedules {
        let date = date_for_day(monday, schedule.day_of_week)?;
        match replacements.remove(&(schedule.schedule_id, date)) {
            Some(mut replaced) => {
                replaced.sort_by_key(|(e, _)| (e.start_date, e.schedule_exemption_id));
                shifts.extend(
                    replaced
                        .into_iter()
                        .map(|(e, kind)| ResolvedShift::from_exemption(e, kind)),
                );
            }
            None => shifts.push(ResolvedShift::from_schedule(schedule, date)),
        }
    }

    // Exemptions whose schedule is gone or does not fall on that date
    shifts.extend(
        replacements
            .into_values()
            .flatten()
            .map(|(e, kind)| ResolvedShift::from_exemption(e, kind)),
    );

    shifts.sort_by_key(|s| (s.start, s.user_id, s.schedule_id, s.schedule_exemption_id));
    Ok(shifts)
}
