//! Strongly typed entity identifiers.
//!
//! # Invariants
//! - Every ID wraps a UUID and serializes as its hyphenated string form.
//! - IDs of different entity types never compare or convert implicitly.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generates a fresh random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wraps an identifier that already exists externally.
            pub fn from_uuid(value: Uuid) -> Self {
                Self(value)
            }

            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(value).map(Self)
            }
        }
    };
}

define_id!(
    /// Owner scope shared by every entity of one user profile.
    ProfileId
);
define_id!(
    /// Root workout aggregate identifier.
    WorkoutLogId
);
define_id!(PerformedGroupLogId);
define_id!(PerformedExerciseLogId);
define_id!(SetId);
define_id!(
    /// Catalog exercise referenced by performed exercise logs.
    ExerciseId
);
define_id!(TrainingPlanId);
define_id!(
    /// Planned session inside a training plan.
    SessionId
);
