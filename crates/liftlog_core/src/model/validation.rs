//! Validation errors raised by domain models before persistence.

use crate::model::ids::ProfileId;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Malformed entity data detected before any store write.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelValidationError {
    /// Weight-like field is negative, NaN or infinite.
    InvalidWeight { field: &'static str, value: f64 },
    /// RPE must be within `1.0..=10.0`.
    RpeOutOfRange(f32),
    /// Percentage of max must be within `(0, 100]`.
    PercentageOutOfRange(f32),
    /// Workout end precedes its start.
    EndBeforeStart { start: i64, end: i64 },
    /// Workout name is blank after trim.
    BlankName,
    /// Child entity belongs to a different profile than its parent.
    ProfileMismatch {
        entity: &'static str,
        id: String,
        expected: ProfileId,
        actual: ProfileId,
    },
    /// The same child ID appears more than once in one aggregate.
    DuplicateId { entity: &'static str, id: String },
    /// Planned set scheme cannot describe any set.
    InvalidScheme(String),
}

impl Display for ModelValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidWeight { field, value } => {
                write!(f, "{field} must be a finite non-negative number, got {value}")
            }
            Self::RpeOutOfRange(value) => write!(f, "rpe must be within 1..=10, got {value}"),
            Self::PercentageOutOfRange(value) => {
                write!(f, "percentage of max must be within (0, 100], got {value}")
            }
            Self::EndBeforeStart { start, end } => {
                write!(f, "workout end {end} is earlier than start {start}")
            }
            Self::BlankName => write!(f, "workout name must not be blank"),
            Self::ProfileMismatch {
                entity,
                id,
                expected,
                actual,
            } => write!(
                f,
                "{entity} {id} belongs to profile {actual}, expected {expected}"
            ),
            Self::DuplicateId { entity, id } => {
                write!(f, "{entity} {id} appears more than once in the aggregate")
            }
            Self::InvalidScheme(message) => write!(f, "invalid set scheme: {message}"),
        }
    }
}

impl Error for ModelValidationError {}

pub(crate) fn ensure_weight(field: &'static str, value: f64) -> Result<(), ModelValidationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ModelValidationError::InvalidWeight { field, value })
    }
}

/// Checks that every immediate child shares the parent's profile and that no
/// child ID repeats.
pub(crate) fn ensure_children<I, K>(
    entity: &'static str,
    expected: ProfileId,
    children: I,
) -> Result<(), ModelValidationError>
where
    I: IntoIterator<Item = (K, ProfileId)>,
    K: Eq + std::hash::Hash + ToString,
{
    let mut seen = std::collections::HashSet::new();
    for (id, actual) in children {
        if actual != expected {
            return Err(ModelValidationError::ProfileMismatch {
                entity,
                id: id.to_string(),
                expected,
                actual,
            });
        }
        let label = id.to_string();
        if !seen.insert(id) {
            return Err(ModelValidationError::DuplicateId { entity, id: label });
        }
    }
    Ok(())
}
