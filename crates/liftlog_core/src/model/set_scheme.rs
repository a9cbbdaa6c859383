//! Planned set schemes as a closed variant type.
//!
//! Every scheme answers the same questions (summary, duration estimate, empty
//! set generation) through one `match`, so adding a variant is a compile error
//! until every behavior handles it.

use crate::model::ids::ProfileId;
use crate::model::performed_set::PerformedSet;
use crate::model::validation::{ensure_weight, ModelValidationError};
use serde::{Deserialize, Serialize};

/// Estimated time under load for one repetition.
const SECONDS_PER_REP: u32 = 3;
/// Work estimate for AMRAP sets without a rep target.
const AMRAP_SET_SECONDS: u32 = 60;

/// One step of a pyramid scheme.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PyramidStep {
    pub reps: u32,
    pub weight: Option<f64>,
}

/// Planned prescription for an exercise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SetScheme {
    /// Fixed sets x reps.
    Standard {
        sets: u32,
        reps: u32,
        weight: Option<f64>,
    },
    /// Fixed sets with a rep window.
    RepRange {
        sets: u32,
        min_reps: u32,
        max_reps: u32,
        weight: Option<f64>,
    },
    /// One set per step, reps/weight changing each step.
    Pyramid { steps: Vec<PyramidStep> },
    /// Sets held for a duration instead of reps.
    Timed { sets: u32, seconds: u32 },
    /// Sets prescribed relative to the lifter's max.
    Percentage {
        sets: u32,
        reps: u32,
        percentage_of_max: f32,
    },
    /// As many reps as possible.
    Amrap { sets: u32, target_reps: Option<u32> },
}

impl SetScheme {
    /// Number of sets the scheme prescribes.
    pub fn set_count(&self) -> u32 {
        match self {
            Self::Standard { sets, .. }
            | Self::RepRange { sets, .. }
            | Self::Timed { sets, .. }
            | Self::Percentage { sets, .. }
            | Self::Amrap { sets, .. } => *sets,
            Self::Pyramid { steps } => steps.len() as u32,
        }
    }

    /// Short human-readable prescription, e.g. `3 x 8-12`.
    pub fn summary(&self) -> String {
        match self {
            Self::Standard {
                sets,
                reps,
                weight: Some(weight),
            } => format!("{sets} x {reps} @ {weight}kg"),
            Self::Standard { sets, reps, .. } => format!("{sets} x {reps}"),
            Self::RepRange {
                sets,
                min_reps,
                max_reps,
                ..
            } => format!("{sets} x {min_reps}-{max_reps}"),
            Self::Pyramid { steps } => steps
                .iter()
                .map(|step| step.reps.to_string())
                .collect::<Vec<_>>()
                .join("/"),
            Self::Timed { sets, seconds } => format!("{sets} x {seconds}s"),
            Self::Percentage {
                sets,
                reps,
                percentage_of_max,
            } => format!("{sets} x {reps} @ {percentage_of_max}%"),
            Self::Amrap {
                sets,
                target_reps: Some(target),
            } => format!("{sets} x AMRAP ({target}+)"),
            Self::Amrap { sets, .. } => format!("{sets} x AMRAP"),
        }
    }

    /// Work time of all sets plus `rest_seconds` between consecutive sets.
    pub fn estimated_duration_seconds(&self, rest_seconds: u32) -> u32 {
        let work: u32 = match self {
            Self::Standard { sets, reps, .. } | Self::Percentage { sets, reps, .. } => {
                sets * reps * SECONDS_PER_REP
            }
            Self::RepRange {
                sets,
                min_reps,
                max_reps,
                ..
            } => sets * ((min_reps + max_reps) / 2) * SECONDS_PER_REP,
            Self::Pyramid { steps } => steps.iter().map(|step| step.reps * SECONDS_PER_REP).sum(),
            Self::Timed { sets, seconds } => sets * seconds,
            Self::Amrap {
                sets,
                target_reps: Some(target),
            } => sets * target * SECONDS_PER_REP,
            Self::Amrap { sets, .. } => sets * AMRAP_SET_SECONDS,
        };
        let rests = self.set_count().saturating_sub(1) * rest_seconds;
        work + rests
    }

    /// Builds the incomplete sets a lifter fills in during the workout.
    pub fn generate_empty_sets(&self, profile_id: ProfileId) -> Vec<PerformedSet> {
        match self {
            Self::Standard { sets, reps, weight } => (0..*sets)
                .map(|_| PerformedSet::planned(profile_id, Some(*reps), *weight))
                .collect(),
            Self::RepRange {
                sets,
                max_reps,
                weight,
                ..
            } => (0..*sets)
                .map(|_| PerformedSet::planned(profile_id, Some(*max_reps), *weight))
                .collect(),
            Self::Pyramid { steps } => steps
                .iter()
                .map(|step| PerformedSet::planned(profile_id, Some(step.reps), step.weight))
                .collect(),
            Self::Timed { sets, seconds } => (0..*sets)
                .map(|_| {
                    let mut set = PerformedSet::planned(profile_id, None, None);
                    set.duration_seconds = Some(*seconds);
                    set
                })
                .collect(),
            Self::Percentage {
                sets,
                reps,
                percentage_of_max,
            } => (0..*sets)
                .map(|_| {
                    let mut set = PerformedSet::planned(profile_id, Some(*reps), None);
                    set.percentage_of_max = Some(*percentage_of_max);
                    set
                })
                .collect(),
            Self::Amrap { sets, target_reps } => (0..*sets)
                .map(|_| PerformedSet::planned(profile_id, *target_reps, None))
                .collect(),
        }
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        if self.set_count() == 0 {
            return Err(ModelValidationError::InvalidScheme(
                "scheme must prescribe at least one set".to_string(),
            ));
        }
        match self {
            Self::Standard { weight, .. } => validate_optional_weight(*weight),
            Self::RepRange {
                min_reps,
                max_reps,
                weight,
                ..
            } => {
                if min_reps > max_reps {
                    return Err(ModelValidationError::InvalidScheme(format!(
                        "rep range {min_reps}-{max_reps} is inverted"
                    )));
                }
                validate_optional_weight(*weight)
            }
            Self::Pyramid { steps } => steps
                .iter()
                .try_for_each(|step| validate_optional_weight(step.weight)),
            Self::Timed { seconds, .. } if *seconds == 0 => Err(
                ModelValidationError::InvalidScheme("timed sets need a duration".to_string()),
            ),
            Self::Percentage {
                percentage_of_max, ..
            } if !(*percentage_of_max > 0.0 && *percentage_of_max <= 100.0) => Err(
                ModelValidationError::PercentageOutOfRange(*percentage_of_max),
            ),
            Self::Timed { .. } | Self::Percentage { .. } | Self::Amrap { .. } => Ok(()),
        }
    }
}

fn validate_optional_weight(weight: Option<f64>) -> Result<(), ModelValidationError> {
    match weight {
        Some(value) => ensure_weight("scheme weight", value),
        None => Ok(()),
    }
}
