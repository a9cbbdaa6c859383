//! Performed set: the leaf of the workout aggregate.
//!
//! # Invariants
//! - A set has no children; its row is the model itself.
//! - Weights are stored in kilograms and must be finite and non-negative.

use crate::model::ids::{ProfileId, SetId};
use crate::model::validation::{ensure_weight, ModelValidationError};
use serde::{Deserialize, Serialize};

/// One set as it was (or is planned to be) performed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformedSet {
    pub id: SetId,
    pub profile_id: ProfileId,
    pub reps: u32,
    /// Kilograms.
    pub weight: f64,
    pub completed: bool,
    /// Rate of perceived exertion, `1.0..=10.0`.
    pub rpe: Option<f32>,
    /// Share of the lifter's max the weight represents.
    pub percentage_of_max: Option<f32>,
    pub planned_reps: Option<u32>,
    pub planned_weight: Option<f64>,
    /// Work duration for timed sets.
    pub duration_seconds: Option<u32>,
}

impl PerformedSet {
    /// Creates an incomplete set with no targets.
    pub fn new(profile_id: ProfileId, reps: u32, weight: f64) -> Self {
        Self::with_id(SetId::new(), profile_id, reps, weight)
    }

    /// Creates a set with a caller-provided stable ID.
    pub fn with_id(id: SetId, profile_id: ProfileId, reps: u32, weight: f64) -> Self {
        Self {
            id,
            profile_id,
            reps,
            weight,
            completed: false,
            rpe: None,
            percentage_of_max: None,
            planned_reps: None,
            planned_weight: None,
            duration_seconds: None,
        }
    }

    /// Creates an empty set carrying only planned targets.
    pub fn planned(
        profile_id: ProfileId,
        planned_reps: Option<u32>,
        planned_weight: Option<f64>,
    ) -> Self {
        let mut set = Self::new(profile_id, 0, 0.0);
        set.planned_reps = planned_reps;
        set.planned_weight = planned_weight;
        set
    }

    /// Records the actual performance and marks the set completed.
    pub fn complete(&mut self, reps: u32, weight: f64, rpe: Option<f32>) {
        self.reps = reps;
        self.weight = weight;
        self.rpe = rpe;
        self.completed = true;
    }

    /// Load moved by this set (`reps * weight`), zero when not completed.
    pub fn volume(&self) -> f64 {
        if self.completed {
            f64::from(self.reps) * self.weight
        } else {
            0.0
        }
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        ensure_weight("weight", self.weight)?;
        if let Some(planned_weight) = self.planned_weight {
            ensure_weight("planned_weight", planned_weight)?;
        }
        if let Some(rpe) = self.rpe {
            if !(1.0..=10.0).contains(&rpe) {
                return Err(ModelValidationError::RpeOutOfRange(rpe));
            }
        }
        if let Some(percentage) = self.percentage_of_max {
            if !(percentage > 0.0 && percentage <= 100.0) {
                return Err(ModelValidationError::PercentageOutOfRange(percentage));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::PerformedSet;
    use crate::model::ids::ProfileId;
    use crate::model::validation::ModelValidationError;

    #[test]
    fn volume_counts_only_completed_sets() {
        let mut set = PerformedSet::new(ProfileId::new(), 5, 100.0);
        assert_eq!(set.volume(), 0.0);
        set.complete(5, 100.0, Some(8.0));
        assert_eq!(set.volume(), 500.0);
    }

    #[test]
    fn validate_rejects_out_of_range_fields() {
        let mut set = PerformedSet::new(ProfileId::new(), 5, f64::NAN);
        assert!(matches!(
            set.validate(),
            Err(ModelValidationError::InvalidWeight { field: "weight", .. })
        ));

        set.weight = 60.0;
        set.rpe = Some(11.0);
        assert_eq!(set.validate(), Err(ModelValidationError::RpeOutOfRange(11.0)));

        set.rpe = None;
        set.percentage_of_max = Some(0.0);
        assert_eq!(
            set.validate(),
            Err(ModelValidationError::PercentageOutOfRange(0.0))
        );
    }
}
