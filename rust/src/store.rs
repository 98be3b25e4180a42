//! Schedule store contract and an in-memory implementation.

use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::collision::{check_collision, CollisionResult};
use crate::error::ScheduleError;
use crate::models::{
    NewScheduleExemption, NewWorkSchedule, ScheduleCandidate, ScheduleExemption, WorkSchedule,
};
use crate::{log_changes, log_debug};

/// Errors raised by a schedule store.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Schedule not found: {0}")]
    ScheduleNotFound(i64),
    #[error("Schedule exemption not found: {0}")]
    ExemptionNotFound(i64),
    #[error("Write rejected by overlap constraint: {0}")]
    OverlapConstraint(String),
    #[error(transparent)]
    Invalid(#[from] ScheduleError),
}

/// Data access for work schedules and their exemptions.
///
/// Holds no business rules beyond what a relational store would enforce at
/// write time; callers validate with the resolver before writing.
pub trait ScheduleStore {
    fn list_schedules_for_user_and_day(&self, user_id: i64, day_of_week: u8) -> Vec<WorkSchedule>;
    fn list_schedules_for_user(&self, user_id: i64) -> Vec<WorkSchedule>;
    fn get_schedule(&self, schedule_id: i64) -> Option<WorkSchedule>;
    fn create_schedule(&mut self, schedule: NewWorkSchedule) -> Result<WorkSchedule, StoreError>;
    fn update_schedule(&mut self, schedule: WorkSchedule) -> Result<WorkSchedule, StoreError>;
    /// Removes the schedule and every exemption that references it.
    fn delete_schedule(&mut self, schedule_id: i64) -> Result<WorkSchedule, StoreError>;

    fn get_exemption(&self, schedule_exemption_id: i64) -> Option<ScheduleExemption>;
    fn create_exemption(
        &mut self,
        exemption: NewScheduleExemption,
    ) -> Result<ScheduleExemption, StoreError>;
    fn update_exemption(
        &mut self,
        exemption: ScheduleExemption,
    ) -> Result<ScheduleExemption, StoreError>;
    fn delete_exemption(
        &mut self,
        schedule_exemption_id: i64,
    ) -> Result<ScheduleExemption, StoreError>;
    fn list_exemptions_for_user(&self, user_id: i64) -> Vec<ScheduleExemption>;
    /// Exemptions in labs belonging to a department (used for unverified-count badges).
    fn list_exemptions_by_department(&self, department_id: i64) -> Vec<ScheduleExemption>;
    fn set_exemption_verified(
        &mut self,
        schedule_exemption_id: i64,
        verified: bool,
    ) -> Result<ScheduleExemption, StoreError>;
}

/// In-memory store.
///
/// Ids are assigned sequentially from 1. Schedule writes are re-checked against
/// the stored rows so overlapping entries can never be committed, even when two
/// callers validated against the same stale snapshot.
#[derive(Debug, Clone, Default)]
pub struct InMemoryScheduleStore {
    schedules: FxHashMap<i64, WorkSchedule>,
    exemptions: FxHashMap<i64, ScheduleExemption>,
    /// lab_id -> department_id
    lab_departments: FxHashMap<i64, i64>,
    next_schedule_id: i64,
    next_exemption_id: i64,
    verbosity: u8,
}

impl InMemoryScheduleStore {
    pub fn new(verbosity: u8) -> Self {
        Self {
            verbosity,
            ..Self::default()
        }
    }

    /// Record which department owns a lab.
    pub fn assign_lab_to_department(&mut self, lab_id: i64, department_id: i64) {
        self.lab_departments.insert(lab_id, department_id);
    }

    pub fn schedule_count(&self) -> usize {
        self.schedules.len()
    }

    pub fn exemption_count(&self) -> usize {
        self.exemptions.len()
    }

    /// Write-time overlap constraint on (user, day, interval).
    fn enforce_no_overlap(&self, candidate: &ScheduleCandidate) -> Result<(), StoreError> {
        let same_day =
            self.list_schedules_for_user_and_day(candidate.user_id, candidate.day_of_week);
        match check_collision(candidate, &same_day)? {
            CollisionResult::NoConflict => Ok(()),
            CollisionResult::Conflicts(conflicts) => {
                let description = conflicts
                    .iter()
                    .map(|c| c.to_string())
                    .collect::<Vec<_>>()
                    .join("; ");
                Err(StoreError::OverlapConstraint(description))
            }
        }
    }

    fn sorted<T>(rows: impl Iterator<Item = (i64, T)>) -> Vec<T> {
        let mut rows: Vec<(i64, T)> = rows.collect();
        rows.sort_by_key(|(id, _)| *id);
        rows.into_iter().map(|(_, row)| row).collect()
    }
}

impl ScheduleStore for InMemoryScheduleStore {
    fn list_schedules_for_user_and_day(&self, user_id: i64, day_of_week: u8) -> Vec<WorkSchedule> {
        Self::sorted(
            self.schedules
                .values()
                .filter(|s| s.user_id == user_id && s.day_of_week == day_of_week)
                .map(|s| (s.schedule_id, s.clone())),
        )
    }

    fn list_schedules_for_user(&self, user_id: i64) -> Vec<WorkSchedule> {
        Self::sorted(
            self.schedules
                .values()
                .filter(|s| s.user_id == user_id)
                .map(|s| (s.schedule_id, s.clone())),
        )
    }

    fn get_schedule(&self, schedule_id: i64) -> Option<WorkSchedule> {
        self.schedules.get(&schedule_id).cloned()
    }

    fn create_schedule(&mut self, schedule: NewWorkSchedule) -> Result<WorkSchedule, StoreError> {
        self.enforce_no_overlap(&ScheduleCandidate::for_new(&schedule))?;

        self.next_schedule_id += 1;
        let created = schedule.into_schedule(self.next_schedule_id);
        log_changes!(
            self.verbosity,
            "Created schedule {} for user {} on day {}",
            created.schedule_id,
            created.user_id,
            created.day_of_week
        );
        self.schedules.insert(created.schedule_id, created.clone());
        Ok(created)
    }

    fn update_schedule(&mut self, schedule: WorkSchedule) -> Result<WorkSchedule, StoreError> {
        if !self.schedules.contains_key(&schedule.schedule_id) {
            return Err(StoreError::ScheduleNotFound(schedule.schedule_id));
        }
        self.enforce_no_overlap(&ScheduleCandidate::for_update(&schedule))?;

        log_changes!(self.verbosity, "Updated schedule {}", schedule.schedule_id);
        self.schedules.insert(schedule.schedule_id, schedule.clone());
        Ok(schedule)
    }

    fn delete_schedule(&mut self, schedule_id: i64) -> Result<WorkSchedule, StoreError> {
        let removed = self
            .schedules
            .remove(&schedule_id)
            .ok_or(StoreError::ScheduleNotFound(schedule_id))?;

        let before = self.exemptions.len();
        self.exemptions
            .retain(|_, e| e.fk_schedule != Some(schedule_id));
        log_changes!(
            self.verbosity,
            "Deleted schedule {} and {} exemption(s)",
            schedule_id,
            before - self.exemptions.len()
        );
        Ok(removed)
    }

    fn get_exemption(&self, schedule_exemption_id: i64) -> Option<ScheduleExemption> {
        self.exemptions.get(&schedule_exemption_id).cloned()
    }

    fn create_exemption(
        &mut self,
        exemption: NewScheduleExemption,
    ) -> Result<ScheduleExemption, StoreError> {
        if let Some(schedule_id) = exemption.fk_schedule {
            if !self.schedules.contains_key(&schedule_id) {
                return Err(StoreError::ScheduleNotFound(schedule_id));
            }
        }

        self.next_exemption_id += 1;
        let created = exemption.into_exemption(self.next_exemption_id);
        log_changes!(
            self.verbosity,
            "Created exemption {} (type {}) for user {}",
            created.schedule_exemption_id,
            created.exemption_type_id,
            created.user_id
        );
        self.exemptions
            .insert(created.schedule_exemption_id, created.clone());
        Ok(created)
    }

    fn update_exemption(
        &mut self,
        exemption: ScheduleExemption,
    ) -> Result<ScheduleExemption, StoreError> {
        let id = exemption.schedule_exemption_id;
        if !self.exemptions.contains_key(&id) {
            return Err(StoreError::ExemptionNotFound(id));
        }
        if let Some(schedule_id) = exemption.fk_schedule {
            if !self.schedules.contains_key(&schedule_id) {
                return Err(StoreError::ScheduleNotFound(schedule_id));
            }
        }

        log_changes!(self.verbosity, "Updated exemption {}", id);
        self.exemptions.insert(id, exemption.clone());
        Ok(exemption)
    }

    fn delete_exemption(
        &mut self,
        schedule_exemption_id: i64,
    ) -> Result<ScheduleExemption, StoreError> {
        let removed = self
            .exemptions
            .remove(&schedule_exemption_id)
            .ok_or(StoreError::ExemptionNotFound(schedule_exemption_id))?;
        log_changes!(self.verbosity, "Deleted exemption {}", schedule_exemption_id);
        Ok(removed)
    }

    fn list_exemptions_for_user(&self, user_id: i64) -> Vec<ScheduleExemption> {
        Self::sorted(
            self.exemptions
                .values()
                .filter(|e| e.user_id == user_id)
                .map(|e| (e.schedule_exemption_id, e.clone())),
        )
    }

    fn list_exemptions_by_department(&self, department_id: i64) -> Vec<ScheduleExemption> {
        let rows = Self::sorted(
            self.exemptions
                .values()
                .filter(|e| self.lab_departments.get(&e.lab_id) == Some(&department_id))
                .map(|e| (e.schedule_exemption_id, e.clone())),
        );
        log_debug!(
            self.verbosity,
            "Department {} has {} exemption(s)",
            department_id,
            rows.len()
        );
        rows
    }

    fn set_exemption_verified(
        &mut self,
        schedule_exemption_id: i64,
        verified: bool,
    ) -> Result<ScheduleExemption, StoreError> {
        let exemption = self
            .exemptions
            .get_mut(&schedule_exemption_id)
            .ok_or(StoreError::ExemptionNotFound(schedule_exemption_id))?;
        exemption.verified = verified;
        log_changes!(
            self.verbosity,
            "Exemption {} marked verified={}",
            schedule_exemption_id,
            verified
        );
        Ok(exemption.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExemptionType, WORK_SCHEDULE_TYPE};
    use chrono::{NaiveDate, NaiveTime};

    fn t(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
    }

    fn draft(
        user: i64,
        lab: i64,
        day: u8,
        time_in: NaiveTime,
        time_out: NaiveTime,
    ) -> NewWorkSchedule {
        NewWorkSchedule {
            user_id: user,
            lab_id: lab,
            day_of_week: day,
            time_in,
            time_out,
            schedule_type_id: WORK_SCHEDULE_TYPE,
            location: None,
        }
    }

    fn late(lab: i64, fk_schedule: Option<i64>) -> NewScheduleExemption {
        let monday = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        NewScheduleExemption {
            start_date: monday.and_time(t(10, 0)),
            end_date: monday.and_time(t(12, 0)),
            exemption_type_id: ExemptionType::Late.id(),
            user_id: 1,
            lab_id: lab,
            verified: false,
            fk_schedule,
        }
    }

    #[test]
    fn test_create_assigns_sequential_ids() {
        let mut store = InMemoryScheduleStore::default();
        let a = store.create_schedule(draft(1, 1, 0, t(9, 0), t(12, 0))).unwrap();
        let b = store.create_schedule(draft(1, 1, 1, t(9, 0), t(12, 0))).unwrap();
        assert_eq!(a.schedule_id, 1);
        assert_eq!(b.schedule_id, 2);
        assert_eq!(store.get_schedule(2), Some(b));
    }

    #[test]
    fn test_list_for_user_and_day() {
        let mut store = InMemoryScheduleStore::default();
        store.create_schedule(draft(1, 1, 0, t(9, 0), t(10, 0))).unwrap();
        store.create_schedule(draft(1, 2, 0, t(13, 0), t(14, 0))).unwrap();
        store.create_schedule(draft(1, 1, 1, t(9, 0), t(10, 0))).unwrap();
        store.create_schedule(draft(2, 1, 0, t(9, 0), t(10, 0))).unwrap();

        let monday = store.list_schedules_for_user_and_day(1, 0);
        let ids: Vec<i64> = monday.iter().map(|s| s.schedule_id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(store.list_schedules_for_user(1).len(), 3);
    }

    #[test]
    fn test_overlap_constraint_on_create() {
        let mut store = InMemoryScheduleStore::default();
        store.create_schedule(draft(1, 1, 0, t(9, 0), t(12, 0))).unwrap();
        let result = store.create_schedule(draft(1, 2, 0, t(11, 0), t(13, 0)));
        assert!(matches!(result, Err(StoreError::OverlapConstraint(_))));
        assert_eq!(store.schedule_count(), 1);
    }

    #[test]
    fn test_invalid_interval_on_create() {
        let mut store = InMemoryScheduleStore::default();
        let result = store.create_schedule(draft(1, 1, 0, t(12, 0), t(9, 0)));
        assert!(matches!(
            result,
            Err(StoreError::Invalid(ScheduleError::InvalidInterval { .. }))
        ));
    }

    #[test]
    fn test_update_in_place() {
        let mut store = InMemoryScheduleStore::default();
        let mut schedule = store.create_schedule(draft(1, 1, 0, t(9, 0), t(12, 0))).unwrap();
        schedule.time_out = t(13, 0);
        store.update_schedule(schedule.clone()).unwrap();
        assert_eq!(store.get_schedule(1).unwrap().time_out, t(13, 0));
    }

    #[test]
    fn test_update_missing_schedule() {
        let mut store = InMemoryScheduleStore::default();
        let ghost = draft(1, 1, 0, t(9, 0), t(12, 0)).into_schedule(99);
        assert_eq!(
            store.update_schedule(ghost),
            Err(StoreError::ScheduleNotFound(99))
        );
    }

    #[test]
    fn test_delete_schedule_removes_its_exemptions() {
        let mut store = InMemoryScheduleStore::default();
        let schedule = store.create_schedule(draft(1, 1, 0, t(9, 0), t(17, 0))).unwrap();
        store.create_exemption(late(1, Some(schedule.schedule_id))).unwrap();
        store.create_exemption(late(1, None)).unwrap();

        store.delete_schedule(schedule.schedule_id).unwrap();
        assert_eq!(store.schedule_count(), 0);
        assert_eq!(store.exemption_count(), 1);
        assert_eq!(
            store.delete_schedule(schedule.schedule_id),
            Err(StoreError::ScheduleNotFound(schedule.schedule_id))
        );
    }

    #[test]
    fn test_exemption_requires_existing_schedule() {
        let mut store = InMemoryScheduleStore::default();
        assert_eq!(
            store.create_exemption(late(1, Some(5))),
            Err(StoreError::ScheduleNotFound(5))
        );
    }

    #[test]
    fn test_list_exemptions_by_department() {
        let mut store = InMemoryScheduleStore::default();
        store.assign_lab_to_department(1, 100);
        store.assign_lab_to_department(2, 100);
        store.assign_lab_to_department(3, 200);
        store.create_exemption(late(1, None)).unwrap();
        store.create_exemption(late(2, None)).unwrap();
        store.create_exemption(late(3, None)).unwrap();
        store.create_exemption(late(4, None)).unwrap();

        assert_eq!(store.list_exemptions_by_department(100).len(), 2);
        assert_eq!(store.list_exemptions_by_department(200).len(), 1);
        assert!(store.list_exemptions_by_department(300).is_empty());
    }

    #[test]
    fn test_set_exemption_verified() {
        let mut store = InMemoryScheduleStore::default();
        let created = store.create_exemption(late(1, None)).unwrap();
        assert!(!created.verified);
        let updated = store
            .set_exemption_verified(created.schedule_exemption_id, true)
            .unwrap();
        assert!(updated.verified);
        assert_eq!(
            store.set_exemption_verified(77, true),
            Err(StoreError::ExemptionNotFound(77))
        );
    }

    #[test]
    fn test_exemption_crud() {
        let mut store = InMemoryScheduleStore::default();
        let mut created = store.create_exemption(late(1, None)).unwrap();
        created.lab_id = 2;
        store.update_exemption(created.clone()).unwrap();
        assert_eq!(store.get_exemption(1).unwrap().lab_id, 2);
        assert_eq!(store.list_exemptions_for_user(1).len(), 1);
        store.delete_exemption(1).unwrap();
        assert_eq!(store.get_exemption(1), None);
        assert_eq!(store.delete_exemption(1), Err(StoreError::ExemptionNotFound(1)));
    }
}
