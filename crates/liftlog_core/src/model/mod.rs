//! Workout domain model.
//!
//! # Responsibility
//! - Define the in-memory workout aggregate and its flat row shapes.
//! - Provide `to_row`/`hydrate` conversions across the storage boundary.
//!
//! # Invariants
//! - Rows hold only immediate child IDs; nested objects exist in memory only.
//! - Child order in memory equals child-ID order in the row.

pub mod exercise_log;
pub mod group_log;
pub mod ids;
pub mod performed_set;
pub mod set_scheme;
pub mod validation;
pub mod workout_log;
