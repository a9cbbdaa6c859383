//! Performed exercise log: one exercise inside a group, owning its sets.
//!
//! # Invariants
//! - `sets` order is the canonical order and maps 1:1 to `set_ids` in the row.
//! - Every set shares the log's profile.

use crate::model::ids::{ExerciseId, PerformedExerciseLogId, ProfileId, SetId};
use crate::model::performed_set::PerformedSet;
use crate::model::set_scheme::SetScheme;
use crate::model::validation::{ensure_children, ModelValidationError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq)]
pub struct PerformedExerciseLog {
    pub id: PerformedExerciseLogId,
    pub profile_id: ProfileId,
    pub exercise_id: ExerciseId,
    pub notes: Option<String>,
    /// Prescription the sets were generated from, if any.
    pub scheme: Option<SetScheme>,
    pub sets: Vec<PerformedSet>,
}

/// Flat stored shape of [`PerformedExerciseLog`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformedExerciseLogRow {
    pub id: PerformedExerciseLogId,
    pub profile_id: ProfileId,
    pub exercise_id: ExerciseId,
    pub notes: Option<String>,
    pub scheme: Option<SetScheme>,
    pub set_ids: Vec<SetId>,
}

impl PerformedExerciseLog {
    pub fn new(profile_id: ProfileId, exercise_id: ExerciseId) -> Self {
        Self {
            id: PerformedExerciseLogId::new(),
            profile_id,
            exercise_id,
            notes: None,
            scheme: None,
            sets: Vec::new(),
        }
    }

    /// Creates a log pre-filled with the empty sets `scheme` prescribes.
    pub fn from_scheme(
        profile_id: ProfileId,
        exercise_id: ExerciseId,
        scheme: SetScheme,
    ) -> Result<Self, ModelValidationError> {
        scheme.validate()?;
        let mut log = Self::new(profile_id, exercise_id);
        log.sets = scheme.generate_empty_sets(profile_id);
        log.scheme = Some(scheme);
        Ok(log)
    }

    pub fn add_set(&mut self, set: PerformedSet) {
        self.sets.push(set);
    }

    /// Removes one set, returning it when present.
    pub fn remove_set(&mut self, id: SetId) -> Option<PerformedSet> {
        let index = self.sets.iter().position(|set| set.id == id)?;
        Some(self.sets.remove(index))
    }

    pub fn completed_sets(&self) -> usize {
        self.sets.iter().filter(|set| set.completed).count()
    }

    pub fn total_volume(&self) -> f64 {
        self.sets.iter().map(PerformedSet::volume).sum()
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        if let Some(scheme) = &self.scheme {
            scheme.validate()?;
        }
        ensure_children(
            "performed set",
            self.profile_id,
            self.sets.iter().map(|set| (set.id, set.profile_id)),
        )
    }

    /// Flattens the log into its row, replacing sets with their IDs.
    pub fn to_row(&self) -> PerformedExerciseLogRow {
        PerformedExerciseLogRow {
            id: self.id,
            profile_id: self.profile_id,
            exercise_id: self.exercise_id,
            notes: self.notes.clone(),
            scheme: self.scheme.clone(),
            set_ids: self.sets.iter().map(|set| set.id).collect(),
        }
    }

    /// Rebuilds the log from its row and already-ordered sets.
    pub fn hydrate(row: PerformedExerciseLogRow, sets: Vec<PerformedSet>) -> Self {
        Self {
            id: row.id,
            profile_id: row.profile_id,
            exercise_id: row.exercise_id,
            notes: row.notes,
            scheme: row.scheme,
            sets,
        }
    }
}
