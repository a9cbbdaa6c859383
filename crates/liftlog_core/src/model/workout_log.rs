//! Workout log aggregate root.
//!
//! # Responsibility
//! - Own the full workout tree: groups -> exercise logs -> sets.
//! - Provide lifecycle helpers (finish, duration) and tree-wide validation.
//!
//! # Invariants
//! - Every descendant shares the root's profile.
//! - Every entity ID occurs at most once in the tree.
//! - `end_time`, when set, is not earlier than `start_time`.

use crate::model::group_log::PerformedGroupLog;
use crate::model::ids::{PerformedGroupLogId, ProfileId, SessionId, TrainingPlanId, WorkoutLogId};
use crate::model::validation::{ensure_children, ModelValidationError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq)]
pub struct WorkoutLog {
    pub id: WorkoutLogId,
    pub profile_id: ProfileId,
    pub name: String,
    pub training_plan_id: Option<TrainingPlanId>,
    pub session_id: Option<SessionId>,
    /// Unix epoch milliseconds.
    pub start_time: i64,
    /// Unix epoch milliseconds. `None` while the workout is in progress.
    pub end_time: Option<i64>,
    pub notes: Option<String>,
    pub groups: Vec<PerformedGroupLog>,
}

/// Flat stored shape of [`WorkoutLog`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutLogRow {
    pub id: WorkoutLogId,
    pub profile_id: ProfileId,
    pub name: String,
    pub training_plan_id: Option<TrainingPlanId>,
    pub session_id: Option<SessionId>,
    pub start_time: i64,
    pub end_time: Option<i64>,
    pub notes: Option<String>,
    pub group_ids: Vec<PerformedGroupLogId>,
}

impl WorkoutLog {
    /// Starts a new, unfinished workout.
    pub fn start(profile_id: ProfileId, name: impl Into<String>, start_time: i64) -> Self {
        Self {
            id: WorkoutLogId::new(),
            profile_id,
            name: name.into(),
            training_plan_id: None,
            session_id: None,
            start_time,
            end_time: None,
            notes: None,
            groups: Vec::new(),
        }
    }

    /// Starts a workout that follows one session of a training plan.
    pub fn from_plan_session(
        profile_id: ProfileId,
        name: impl Into<String>,
        start_time: i64,
        training_plan_id: TrainingPlanId,
        session_id: SessionId,
    ) -> Self {
        let mut log = Self::start(profile_id, name, start_time);
        log.training_plan_id = Some(training_plan_id);
        log.session_id = Some(session_id);
        log
    }

    pub fn add_group(&mut self, group: PerformedGroupLog) {
        self.groups.push(group);
    }

    pub fn remove_group(&mut self, id: PerformedGroupLogId) -> Option<PerformedGroupLog> {
        let index = self.groups.iter().position(|group| group.id == id)?;
        Some(self.groups.remove(index))
    }

    pub fn finish(&mut self, end_time: i64) -> Result<(), ModelValidationError> {
        if end_time < self.start_time {
            return Err(ModelValidationError::EndBeforeStart {
                start: self.start_time,
                end: end_time,
            });
        }
        self.end_time = Some(end_time);
        Ok(())
    }

    pub fn is_finished(&self) -> bool {
        self.end_time.is_some()
    }

    /// Elapsed milliseconds of a finished workout.
    pub fn duration_ms(&self) -> Option<i64> {
        self.end_time.map(|end| end - self.start_time)
    }

    pub fn total_sets(&self) -> usize {
        self.groups
            .iter()
            .flat_map(|group| group.exercises.iter())
            .map(|exercise| exercise.sets.len())
            .sum()
    }

    /// Shallow checks on the root plus tree-wide ID uniqueness.
    ///
    /// Descendants validate their own fields when their repositories save
    /// them inside the same write-scope.
    pub fn validate(&self) -> Result<(), ModelValidationError> {
        if self.name.trim().is_empty() {
            return Err(ModelValidationError::BlankName);
        }
        if let Some(end) = self.end_time {
            if end < self.start_time {
                return Err(ModelValidationError::EndBeforeStart {
                    start: self.start_time,
                    end,
                });
            }
        }
        ensure_children(
            "performed group log",
            self.profile_id,
            self.groups.iter().map(|group| (group.id, group.profile_id)),
        )?;
        self.ensure_unique_descendant_ids()
    }

    fn ensure_unique_descendant_ids(&self) -> Result<(), ModelValidationError> {
        let mut exercise_ids = HashSet::new();
        let mut set_ids = HashSet::new();
        for exercise in self.groups.iter().flat_map(|group| group.exercises.iter()) {
            if !exercise_ids.insert(exercise.id) {
                return Err(ModelValidationError::DuplicateId {
                    entity: "performed exercise log",
                    id: exercise.id.to_string(),
                });
            }
            for set in &exercise.sets {
                if !set_ids.insert(set.id) {
                    return Err(ModelValidationError::DuplicateId {
                        entity: "performed set",
                        id: set.id.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn to_row(&self) -> WorkoutLogRow {
        WorkoutLogRow {
            id: self.id,
            profile_id: self.profile_id,
            name: self.name.clone(),
            training_plan_id: self.training_plan_id,
            session_id: self.session_id,
            start_time: self.start_time,
            end_time: self.end_time,
            notes: self.notes.clone(),
            group_ids: self.groups.iter().map(|group| group.id).collect(),
        }
    }

    pub fn hydrate(row: WorkoutLogRow, groups: Vec<PerformedGroupLog>) -> Self {
        Self {
            id: row.id,
            profile_id: row.profile_id,
            name: row.name,
            training_plan_id: row.training_plan_id,
            session_id: row.session_id,
            start_time: row.start_time,
            end_time: row.end_time,
            notes: row.notes,
            groups,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::WorkoutLog;
    use crate::model::exercise_log::PerformedExerciseLog;
    use crate::model::group_log::{GroupType, PerformedGroupLog};
    use crate::model::ids::{ExerciseId, ProfileId};
    use crate::model::performed_set::PerformedSet;
    use crate::model::validation::ModelValidationError;

    #[test]
    fn finish_rejects_end_before_start() {
        let mut log = WorkoutLog::start(ProfileId::new(), "Push", 10_000);
        assert!(log.finish(5_000).is_err());
        log.finish(70_000).unwrap();
        assert!(log.is_finished());
        assert_eq!(log.duration_ms(), Some(60_000));
    }

    #[test]
    fn validate_detects_set_shared_between_exercises() {
        let profile_id = ProfileId::new();
        let shared = PerformedSet::new(profile_id, 5, 50.0);

        let mut first = PerformedExerciseLog::new(profile_id, ExerciseId::new());
        first.add_set(shared.clone());
        let mut second = PerformedExerciseLog::new(profile_id, ExerciseId::new());
        second.add_set(shared);

        let mut group = PerformedGroupLog::new(profile_id, GroupType::Superset, 90);
        group.add_exercise(first);
        group.add_exercise(second);

        let mut log = WorkoutLog::start(profile_id, "Pull", 0);
        log.add_group(group);

        assert!(matches!(
            log.validate(),
            Err(ModelValidationError::DuplicateId {
                entity: "performed set",
                ..
            })
        ));
    }

    #[test]
    fn validate_rejects_blank_name() {
        let log = WorkoutLog::start(ProfileId::new(), "   ", 0);
        assert_eq!(log.validate(), Err(ModelValidationError::BlankName));
    }
}
