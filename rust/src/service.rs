//! Schedule service: validates requests against a fresh store snapshot, then writes.
//!
//! Every write reads the relevant schedules immediately before validating. The
//! store's own write-time overlap constraint catches the check-then-act race
//! between two requests validated against the same snapshot.

use chrono::{NaiveDate, NaiveTime};
use thiserror::Error;

use crate::collision::{check_collision, check_collision_batch, DayConflict};
use crate::config::{BatchPolicy, ResolverConfig};
use crate::error::ScheduleError;
use crate::exemption::validate_exemption;
use crate::models::{
    NewScheduleExemption, NewWorkSchedule, ScheduleCandidate, ScheduleExemption, WorkSchedule,
    WORK_SCHEDULE_TYPE,
};
use crate::store::{ScheduleStore, StoreError};
use crate::time::{parse_time_of_day, validate_day_of_week, weekday_index};
use crate::week::{resolve_week, ResolvedShift};
use crate::{log_changes, log_checks};

/// Errors returned by the schedule service.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ServiceError {
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Schedule request rejected: {}", describe_days(.0))]
    BatchRejected(Vec<DayConflict>),
}

fn describe_days(rejected: &[DayConflict]) -> String {
    rejected
        .iter()
        .map(|day| {
            let conflicts = day
                .conflicts
                .iter()
                .map(|c| c.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            format!("day {} conflicts with {}", day.day_of_week, conflicts)
        })
        .collect::<Vec<_>>()
        .join(" | ")
}

/// A request to create the same shift on one or more weekdays.
#[derive(Clone, Debug, PartialEq)]
pub struct ScheduleRequest {
    pub user_id: i64,
    pub lab_id: i64,
    pub days: Vec<u8>,
    pub time_in: NaiveTime,
    pub time_out: NaiveTime,
    pub schedule_type_id: i64,
    pub location: Option<String>,
}

impl ScheduleRequest {
    /// Build a work-shift request from "HH:mm" transport strings.
    pub fn with_clock_times(
        user_id: i64,
        lab_id: i64,
        days: Vec<u8>,
        time_in: &str,
        time_out: &str,
    ) -> Result<Self, ScheduleError> {
        Ok(Self {
            user_id,
            lab_id,
            days,
            time_in: parse_time_of_day(time_in)?,
            time_out: parse_time_of_day(time_out)?,
            schedule_type_id: WORK_SCHEDULE_TYPE,
            location: None,
        })
    }

    fn candidate(&self, day_of_week: u8) -> ScheduleCandidate {
        ScheduleCandidate {
            user_id: self.user_id,
            lab_id: self.lab_id,
            time_in: self.time_in,
            time_out: self.time_out,
            day_of_week,
            exclude_schedule_id: None,
        }
    }

    fn for_day(&self, day_of_week: u8) -> NewWorkSchedule {
        NewWorkSchedule {
            user_id: self.user_id,
            lab_id: self.lab_id,
            day_of_week,
            time_in: self.time_in,
            time_out: self.time_out,
            schedule_type_id: self.schedule_type_id,
            location: self.location.clone(),
        }
    }
}

/// Result of a multi-day schedule request.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchReport {
    pub created: Vec<WorkSchedule>,
    /// Days skipped under the best-effort policy
    pub rejected: Vec<DayConflict>,
}

/// Validates and persists schedules and exemptions through a store.
pub struct ScheduleService<S: ScheduleStore> {
    store: S,
    config: ResolverConfig,
    policy: BatchPolicy,
}

impl<S: ScheduleStore> ScheduleService<S> {
    /// Create a service; an unknown batch policy is rejected here.
    pub fn new(store: S, config: ResolverConfig) -> Result<Self, ServiceError> {
        let policy = config.policy()?;
        Ok(Self {
            store,
            config,
            policy,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Create a weekly schedule on every requested day.
    ///
    /// Under `AllOrNothing` a conflict on any day fails the request with
    /// `BatchRejected` and nothing is written. Under `BestEffort` clear days are
    /// written and conflicting days are reported in `BatchReport::rejected`.
    pub fn create_weekly_schedule(
        &mut self,
        request: &ScheduleRequest,
    ) -> Result<BatchReport, ServiceError> {
        let verbosity = self.config.verbosity;
        let Some(&first_day) = request.days.first() else {
            return Err(ScheduleError::NoDaysRequested.into());
        };
        let snapshot = self.store.list_schedules_for_user(request.user_id);
        let check = check_collision_batch(
            &request.candidate(first_day),
            &request.days,
            &snapshot,
            self.policy,
            verbosity,
        )?;

        if self.policy == BatchPolicy::AllOrNothing && !check.is_clear() {
            log_checks!(
                verbosity,
                "Rejected schedule request for user {}: {} day(s) conflict",
                request.user_id,
                check.rejected.len()
            );
            return Err(ServiceError::BatchRejected(check.rejected));
        }

        let mut report = BatchReport {
            created: Vec::with_capacity(check.accepted_days.len()),
            rejected: check.rejected,
        };

        for day in check.accepted_days {
            match self.store.create_schedule(request.for_day(day)) {
                Ok(created) => report.created.push(created),
                Err(StoreError::OverlapConstraint(reason)) => {
                    log_checks!(verbosity, "Day {} lost a write race: {}", day, reason);
                    match self.policy {
                        BatchPolicy::AllOrNothing => {
                            self.roll_back(&report.created)?;
                            return Err(StoreError::OverlapConstraint(reason).into());
                        }
                        BatchPolicy::BestEffort => {
                            report.rejected.push(self.conflicts_on_day(request, day)?);
                        }
                    }
                }
                Err(err) => {
                    if self.policy == BatchPolicy::AllOrNothing {
                        self.roll_back(&report.created)?;
                    }
                    return Err(err.into());
                }
            }
        }

        report.rejected.sort_by_key(|r| r.day_of_week);
        log_changes!(
            verbosity,
            "Schedule request for user {}: {} created, {} rejected",
            request.user_id,
            report.created.len(),
            report.rejected.len()
        );
        Ok(report)
    }

    fn roll_back(&mut self, created: &[WorkSchedule]) -> Result<(), ServiceError> {
        for schedule in created {
            self.store.delete_schedule(schedule.schedule_id)?;
        }
        Ok(())
    }

    fn conflicts_on_day(
        &self,
        request: &ScheduleRequest,
        day_of_week: u8,
    ) -> Result<DayConflict, ServiceError> {
        let candidate = request.candidate(day_of_week);
        let current = self
            .store
            .list_schedules_for_user_and_day(request.user_id, day_of_week);
        let result = check_collision(&candidate, &current)?;
        Ok(DayConflict {
            day_of_week,
            conflicts: result.conflicts().to_vec(),
        })
    }

    /// Update a schedule in place; it is never compared against itself.
    pub fn update_schedule(
        &mut self,
        schedule: WorkSchedule,
    ) -> Result<WorkSchedule, ServiceError> {
        validate_day_of_week(schedule.day_of_week)?;
        if self.store.get_schedule(schedule.schedule_id).is_none() {
            return Err(StoreError::ScheduleNotFound(schedule.schedule_id).into());
        }

        let snapshot = self
            .store
            .list_schedules_for_user_and_day(schedule.user_id, schedule.day_of_week);
        check_collision(&ScheduleCandidate::for_update(&schedule), &snapshot)?.into_result()?;

        Ok(self.store.update_schedule(schedule)?)
    }

    pub fn delete_schedule(&mut self, schedule_id: i64) -> Result<WorkSchedule, ServiceError> {
        Ok(self.store.delete_schedule(schedule_id)?)
    }

    /// Validate an exemption against its parent schedule and the user's schedules
    /// on that day, as currently stored.
    pub fn check_exemption(&self, exemption: &ScheduleExemption) -> Result<(), ServiceError> {
        let parent = match exemption.fk_schedule {
            Some(schedule_id) => Some(
                self.store
                    .get_schedule(schedule_id)
                    .ok_or(StoreError::ScheduleNotFound(schedule_id))?,
            ),
            None => None,
        };
        let existing = weekday_index(exemption.date())
            .map(|day| {
                self.store
                    .list_schedules_for_user_and_day(exemption.user_id, day)
            })
            .unwrap_or_default();

        validate_exemption(exemption, parent.as_ref(), &existing)?;
        Ok(())
    }

    /// Validate and store a new exemption.
    pub fn submit_exemption(
        &mut self,
        exemption: NewScheduleExemption,
    ) -> Result<ScheduleExemption, ServiceError> {
        // Id is assigned by the store; validation does not look at it
        self.check_exemption(&exemption.clone().into_exemption(0))?;
        let created = self.store.create_exemption(exemption)?;
        if !created.verified {
            log_checks!(
                self.config.verbosity,
                "Exemption {} awaits verification",
                created.schedule_exemption_id
            );
        }
        Ok(created)
    }

    /// Re-validate and store an edited exemption.
    pub fn update_exemption(
        &mut self,
        exemption: ScheduleExemption,
    ) -> Result<ScheduleExemption, ServiceError> {
        self.check_exemption(&exemption)?;
        Ok(self.store.update_exemption(exemption)?)
    }

    pub fn delete_exemption(
        &mut self,
        schedule_exemption_id: i64,
    ) -> Result<ScheduleExemption, ServiceError> {
        Ok(self.store.delete_exemption(schedule_exemption_id)?)
    }

    /// Mark an exemption as reviewed by the department head.
    pub fn verify_exemption(
        &mut self,
        schedule_exemption_id: i64,
    ) -> Result<ScheduleExemption, ServiceError> {
        Ok(self
            .store
            .set_exemption_verified(schedule_exemption_id, true)?)
    }

    /// Number of exemptions in a department still awaiting review.
    pub fn unverified_exemption_count(&self, department_id: i64) -> usize {
        self.store
            .list_exemptions_by_department(department_id)
            .iter()
            .filter(|e| !e.verified)
            .count()
    }

    /// A user's shifts for the week containing `reference_week_start`.
    pub fn week_view(
        &self,
        user_id: i64,
        reference_week_start: NaiveDate,
    ) -> Result<Vec<ResolvedShift>, ServiceError> {
        let schedules = self.store.list_schedules_for_user(user_id);
        let exemptions = self.store.list_exemptions_for_user(user_id);
        Ok(resolve_week(&schedules, &exemptions, reference_week_start)?)
    }
}
