//! Core data records for recurring work schedules and their exemptions.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use pyo3::prelude::*;
use std::fmt;

use crate::error::ScheduleError;
use crate::time::{day_name, format_time_of_day, TimeInterval};

/// Schedule type id for regular work shifts.
pub const WORK_SCHEDULE_TYPE: i64 = 1;

/// A recurring weekly commitment of a user to a lab.
#[pyclass]
#[derive(Clone, Debug, PartialEq)]
pub struct WorkSchedule {
    #[pyo3(get, set)]
    pub schedule_id: i64,
    #[pyo3(get, set)]
    pub user_id: i64,
    #[pyo3(get, set)]
    pub lab_id: i64,
    /// 0=Monday..4=Friday
    #[pyo3(get, set)]
    pub day_of_week: u8,
    #[pyo3(get, set)]
    pub time_in: NaiveTime,
    #[pyo3(get, set)]
    pub time_out: NaiveTime,
    #[pyo3(get, set)]
    pub schedule_type_id: i64,
    /// Free-text override for where the shift takes place
    #[pyo3(get, set)]
    pub location: Option<String>,
}

impl WorkSchedule {
    /// The shift's time range as a validated half-open interval.
    pub fn interval(&self) -> Result<TimeInterval, ScheduleError> {
        TimeInterval::new(self.time_in, self.time_out)
    }
}

#[pymethods]
impl WorkSchedule {
    #[new]
    #[pyo3(signature = (
        schedule_id,
        user_id,
        lab_id,
        day_of_week,
        time_in,
        time_out,
        schedule_type_id=WORK_SCHEDULE_TYPE,
        location=None
    ))]
    #[allow(clippy::too_many_arguments)]
    fn new(
        schedule_id: i64,
        user_id: i64,
        lab_id: i64,
        day_of_week: u8,
        time_in: NaiveTime,
        time_out: NaiveTime,
        schedule_type_id: i64,
        location: Option<String>,
    ) -> Self {
        Self {
            schedule_id,
            user_id,
            lab_id,
            day_of_week,
            time_in,
            time_out,
            schedule_type_id,
            location,
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "WorkSchedule(schedule_id={}, user_id={}, lab_id={}, day={}, {}-{})",
            self.schedule_id,
            self.user_id,
            self.lab_id,
            self.day_of_week,
            format_time_of_day(self.time_in),
            format_time_of_day(self.time_out)
        )
    }
}

/// Fields of a work schedule before the store assigns its id.
#[derive(Clone, Debug, PartialEq)]
pub struct NewWorkSchedule {
    pub user_id: i64,
    pub lab_id: i64,
    pub day_of_week: u8,
    pub time_in: NaiveTime,
    pub time_out: NaiveTime,
    pub schedule_type_id: i64,
    pub location: Option<String>,
}

impl NewWorkSchedule {
    pub fn into_schedule(self, schedule_id: i64) -> WorkSchedule {
        WorkSchedule {
            schedule_id,
            user_id: self.user_id,
            lab_id: self.lab_id,
            day_of_week: self.day_of_week,
            time_in: self.time_in,
            time_out: self.time_out,
            schedule_type_id: self.schedule_type_id,
            location: self.location,
        }
    }
}

/// Classification of a one-off deviation from a work schedule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ExemptionType {
    CallingOut = 1,
    Late = 2,
    WorkingInNewRoom = 3,
    WorkingOutsideSchedule = 4,
    LeavingEarly = 5,
}

impl ExemptionType {
    pub fn id(self) -> i32 {
        self as i32
    }

    /// Every type except an unscheduled extra shift deviates from a parent schedule.
    pub fn has_parent_schedule(self) -> bool {
        self != ExemptionType::WorkingOutsideSchedule
    }

    pub fn name(self) -> &'static str {
        match self {
            ExemptionType::CallingOut => "calling_out",
            ExemptionType::Late => "late",
            ExemptionType::WorkingInNewRoom => "working_in_new_room",
            ExemptionType::WorkingOutsideSchedule => "working_outside_schedule",
            ExemptionType::LeavingEarly => "leaving_early",
        }
    }
}

impl TryFrom<i32> for ExemptionType {
    type Error = ScheduleError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(ExemptionType::CallingOut),
            2 => Ok(ExemptionType::Late),
            3 => Ok(ExemptionType::WorkingInNewRoom),
            4 => Ok(ExemptionType::WorkingOutsideSchedule),
            5 => Ok(ExemptionType::LeavingEarly),
            other => Err(ScheduleError::UnknownExemptionType(other)),
        }
    }
}

/// A one-off deviation from a work schedule on a specific date.
#[pyclass]
#[derive(Clone, Debug, PartialEq)]
pub struct ScheduleExemption {
    #[pyo3(get, set)]
    pub schedule_exemption_id: i64,
    #[pyo3(get, set)]
    pub start_date: NaiveDateTime,
    #[pyo3(get, set)]
    pub end_date: NaiveDateTime,
    #[pyo3(get, set)]
    pub exemption_type_id: i32,
    #[pyo3(get, set)]
    pub user_id: i64,
    #[pyo3(get, set)]
    pub lab_id: i64,
    /// Unverified exemptions are flagged for department-head review
    #[pyo3(get, set)]
    pub verified: bool,
    /// Schedule this exemption deviates from (None for outside-schedule work)
    #[pyo3(get, set)]
    pub fk_schedule: Option<i64>,
}

impl ScheduleExemption {
    pub fn exemption_type(&self) -> Result<ExemptionType, ScheduleError> {
        ExemptionType::try_from(self.exemption_type_id)
    }

    /// Calendar date the exemption applies to.
    pub fn date(&self) -> NaiveDate {
        self.start_date.date()
    }
}

#[pymethods]
impl ScheduleExemption {
    #[new]
    #[pyo3(signature = (
        schedule_exemption_id,
        start_date,
        end_date,
        exemption_type_id,
        user_id,
        lab_id,
        verified=false,
        fk_schedule=None
    ))]
    #[allow(clippy::too_many_arguments)]
    fn new(
        schedule_exemption_id: i64,
        start_date: NaiveDateTime,
        end_date: NaiveDateTime,
        exemption_type_id: i32,
        user_id: i64,
        lab_id: i64,
        verified: bool,
        fk_schedule: Option<i64>,
    ) -> Self {
        Self {
            schedule_exemption_id,
            start_date,
            end_date,
            exemption_type_id,
            user_id,
            lab_id,
            verified,
            fk_schedule,
        }
    }

    fn __repr__(&self) -> String {
        let kind = match self.exemption_type() {
            Ok(kind) => kind.name().to_string(),
            Err(_) => self.exemption_type_id.to_string(),
        };
        format!(
            "ScheduleExemption(id={}, type={}, user_id={}, {} - {}, schedule={:?})",
            self.schedule_exemption_id,
            kind,
            self.user_id,
            self.start_date,
            self.end_date,
            self.fk_schedule
        )
    }
}

/// Fields of an exemption before the store assigns its id.
#[derive(Clone, Debug, PartialEq)]
pub struct NewScheduleExemption {
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
    pub exemption_type_id: i32,
    pub user_id: i64,
    pub lab_id: i64,
    pub verified: bool,
    pub fk_schedule: Option<i64>,
}

impl NewScheduleExemption {
    pub fn into_exemption(self, schedule_exemption_id: i64) -> ScheduleExemption {
        ScheduleExemption {
            schedule_exemption_id,
            start_date: self.start_date,
            end_date: self.end_date,
            exemption_type_id: self.exemption_type_id,
            user_id: self.user_id,
            lab_id: self.lab_id,
            verified: self.verified,
            fk_schedule: self.fk_schedule,
        }
    }
}

/// A proposed time range to check against a user's existing schedules.
#[pyclass]
#[derive(Clone, Debug, PartialEq)]
pub struct ScheduleCandidate {
    #[pyo3(get, set)]
    pub user_id: i64,
    #[pyo3(get, set)]
    pub lab_id: i64,
    #[pyo3(get, set)]
    pub time_in: NaiveTime,
    #[pyo3(get, set)]
    pub time_out: NaiveTime,
    #[pyo3(get, set)]
    pub day_of_week: u8,
    /// Entry being updated; never compared against itself
    #[pyo3(get, set)]
    pub exclude_schedule_id: Option<i64>,
}

impl ScheduleCandidate {
    /// Candidate for re-checking an existing schedule after it was edited.
    pub fn for_update(schedule: &WorkSchedule) -> Self {
        Self {
            user_id: schedule.user_id,
            lab_id: schedule.lab_id,
            time_in: schedule.time_in,
            time_out: schedule.time_out,
            day_of_week: schedule.day_of_week,
            exclude_schedule_id: Some(schedule.schedule_id),
        }
    }

    /// Candidate for inserting a schedule that has no id yet.
    pub fn for_new(schedule: &NewWorkSchedule) -> Self {
        Self {
            user_id: schedule.user_id,
            lab_id: schedule.lab_id,
            time_in: schedule.time_in,
            time_out: schedule.time_out,
            day_of_week: schedule.day_of_week,
            exclude_schedule_id: None,
        }
    }
}

#[pymethods]
impl ScheduleCandidate {
    #[new]
    #[pyo3(signature = (user_id, lab_id, time_in, time_out, day_of_week, exclude_schedule_id=None))]
    fn new(
        user_id: i64,
        lab_id: i64,
        time_in: NaiveTime,
        time_out: NaiveTime,
        day_of_week: u8,
        exclude_schedule_id: Option<i64>,
    ) -> Self {
        Self {
            user_id,
            lab_id,
            time_in,
            time_out,
            day_of_week,
            exclude_schedule_id,
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "ScheduleCandidate(user_id={}, lab_id={}, day={}, {}-{}, exclude={:?})",
            self.user_id,
            self.lab_id,
            self.day_of_week,
            format_time_of_day(self.time_in),
            format_time_of_day(self.time_out),
            self.exclude_schedule_id
        )
    }
}

/// An existing schedule that overlaps a candidate.
#[pyclass]
#[derive(Clone, Debug, PartialEq)]
pub struct ConflictDescription {
    #[pyo3(get)]
    pub schedule_id: i64,
    #[pyo3(get)]
    pub lab_id: i64,
    #[pyo3(get)]
    pub location: Option<String>,
    #[pyo3(get)]
    pub day_of_week: u8,
    #[pyo3(get)]
    pub time_in: NaiveTime,
    #[pyo3(get)]
    pub time_out: NaiveTime,
}

impl ConflictDescription {
    pub fn from_schedule(schedule: &WorkSchedule) -> Self {
        Self {
            schedule_id: schedule.schedule_id,
            lab_id: schedule.lab_id,
            location: schedule.location.clone(),
            day_of_week: schedule.day_of_week,
            time_in: schedule.time_in,
            time_out: schedule.time_out,
        }
    }
}

impl fmt::Display for ConflictDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lab {}", self.lab_id)?;
        if let Some(location) = &self.location {
            write!(f, " ({})", location)?;
        }
        write!(
            f,
            ", {} {}-{} (schedule #{})",
            day_name(self.day_of_week),
            format_time_of_day(self.time_in),
            format_time_of_day(self.time_out),
            self.schedule_id
        )
    }
}

#[pymethods]
impl ConflictDescription {
    /// Human-readable description naming the conflicting lab and time range.
    #[getter]
    fn message(&self) -> String {
        self.to_string()
    }

    fn __repr__(&self) -> String {
        format!("ConflictDescription({})", self)
    }
}
