//! Bulk-delete categories.

use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceCategory {
    All,
    Profiles,
    Exercises,
    TrainingPlans,
    WorkoutLogs,
    MaxLogs,
    /// Body weights and body measurements.
    BodyMetrics,
    /// Aggregate children no parent references.
    OrphanedData,
    /// Workouts older than the retention window.
    OldWorkoutLogs,
    /// Unfinished workouts older than the session expiry window.
    ExpiredSessions,
}

impl MaintenanceCategory {
    /// What `all` runs, dependants before the profiles they belong to.
    pub const ALL_ORDER: [MaintenanceCategory; 7] = [
        Self::WorkoutLogs,
        Self::TrainingPlans,
        Self::Exercises,
        Self::MaxLogs,
        Self::BodyMetrics,
        Self::OrphanedData,
        Self::Profiles,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Profiles => "profiles",
            Self::Exercises => "exercises",
            Self::TrainingPlans => "training_plans",
            Self::WorkoutLogs => "workout_logs",
            Self::MaxLogs => "max_logs",
            Self::BodyMetrics => "body_metrics",
            Self::OrphanedData => "orphaned_data",
            Self::OldWorkoutLogs => "old_workout_logs",
            Self::ExpiredSessions => "expired_sessions",
        }
    }

    /// Concrete categories to process, in order.
    pub fn expand(self) -> Vec<MaintenanceCategory> {
        match self {
            Self::All => Self::ALL_ORDER.to_vec(),
            other => vec![other],
        }
    }
}

impl Display for MaintenanceCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategory(pub String);

impl Display for UnknownCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown maintenance category `{}`", self.0)
    }
}

impl Error for UnknownCategory {}

impl FromStr for MaintenanceCategory {
    type Err = UnknownCategory;

    /// Case-insensitive; `-` and `_` are interchangeable.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace('-', "_");
        let category = match normalized.as_str() {
            "all" => Self::All,
            "profiles" => Self::Profiles,
            "exercises" => Self::Exercises,
            "training_plans" => Self::TrainingPlans,
            "workout_logs" => Self::WorkoutLogs,
            "max_logs" => Self::MaxLogs,
            "body_metrics" => Self::BodyMetrics,
            "orphaned_data" => Self::OrphanedData,
            "old_workout_logs" => Self::OldWorkoutLogs,
            "expired_sessions" => Self::ExpiredSessions,
            _ => return Err(UnknownCategory(value.to_string())),
        };
        Ok(category)
    }
}
