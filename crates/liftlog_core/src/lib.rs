//! Core persistence and maintenance for liftlog workout data.
//! Aggregate invariants live here; callers only see repositories and services.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod store;

pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::exercise_log::PerformedExerciseLog;
pub use model::group_log::{GroupType, PerformedGroupLog};
pub use model::ids::{
    ExerciseId, PerformedExerciseLogId, PerformedGroupLogId, ProfileId, SessionId, SetId,
    TrainingPlanId, WorkoutLogId,
};
pub use model::performed_set::PerformedSet;
pub use model::set_scheme::{PyramidStep, SetScheme};
pub use model::validation::ModelValidationError;
pub use model::workout_log::WorkoutLog;
pub use repo::{AggregateRepository, Document, RepoError, RepoResult, Repositories};
pub use service::maintenance::{
    BulkDeleteOutcome, BulkDeleteRequest, CancellationToken, IntegrityReport, MaintenanceCategory,
    MaintenanceConfig, MaintenanceEngine, MaintenanceError, MaintenanceProgress,
    OptimizationReport,
};
pub use store::{CollectionKind, FlatStore, StoreError, StoreResult, WriteTx};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
