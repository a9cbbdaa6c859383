//! Performed group log: a block of exercises done together (single, superset,
//! circuit ...), owning its exercise logs.

use crate::model::exercise_log::PerformedExerciseLog;
use crate::model::ids::{PerformedExerciseLogId, PerformedGroupLogId, ProfileId};
use crate::model::validation::{ensure_children, ModelValidationError};
use serde::{Deserialize, Serialize};

/// How exercises of one group are sequenced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupType {
    Single,
    Superset,
    Circuit,
    /// Every minute on the minute.
    Emom,
    Amrap,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PerformedGroupLog {
    pub id: PerformedGroupLogId,
    pub profile_id: ProfileId,
    pub group_type: GroupType,
    pub rest_seconds: u32,
    pub exercises: Vec<PerformedExerciseLog>,
}

/// Flat stored shape of [`PerformedGroupLog`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformedGroupLogRow {
    pub id: PerformedGroupLogId,
    pub profile_id: ProfileId,
    pub group_type: GroupType,
    pub rest_seconds: u32,
    pub exercise_ids: Vec<PerformedExerciseLogId>,
}

impl PerformedGroupLog {
    pub fn new(profile_id: ProfileId, group_type: GroupType, rest_seconds: u32) -> Self {
        Self {
            id: PerformedGroupLogId::new(),
            profile_id,
            group_type,
            rest_seconds,
            exercises: Vec::new(),
        }
    }

    pub fn add_exercise(&mut self, exercise: PerformedExerciseLog) {
        self.exercises.push(exercise);
    }

    pub fn remove_exercise(&mut self, id: PerformedExerciseLogId) -> Option<PerformedExerciseLog> {
        let index = self
            .exercises
            .iter()
            .position(|exercise| exercise.id == id)?;
        Some(self.exercises.remove(index))
    }

    /// Planned duration of the group using each exercise's scheme.
    pub fn estimated_duration_seconds(&self) -> u32 {
        self.exercises
            .iter()
            .filter_map(|exercise| exercise.scheme.as_ref())
            .map(|scheme| scheme.estimated_duration_seconds(self.rest_seconds))
            .sum()
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        ensure_children(
            "performed exercise log",
            self.profile_id,
            self.exercises
                .iter()
                .map(|exercise| (exercise.id, exercise.profile_id)),
        )
    }

    pub fn to_row(&self) -> PerformedGroupLogRow {
        PerformedGroupLogRow {
            id: self.id,
            profile_id: self.profile_id,
            group_type: self.group_type,
            rest_seconds: self.rest_seconds,
            exercise_ids: self.exercises.iter().map(|exercise| exercise.id).collect(),
        }
    }

    pub fn hydrate(row: PerformedGroupLogRow, exercises: Vec<PerformedExerciseLog>) -> Self {
        Self {
            id: row.id,
            profile_id: row.profile_id,
            group_type: row.group_type,
            rest_seconds: row.rest_seconds,
            exercises,
        }
    }
}
