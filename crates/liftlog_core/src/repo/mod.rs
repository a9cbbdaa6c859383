//! Repository layer over the flat store.
//!
//! # Responsibility
//! - Persist the workout aggregate (workout -> groups -> exercise logs ->
//!   sets) as one atomic unit per public call.
//! - Rebuild in-memory graphs from flat ID-array rows with one batched
//!   lookup per level.
//!
//! # Invariants
//! - Public `save`/`delete` open exactly one write-scope; `*_in` forms only
//!   join the caller's scope and never open their own.
//! - Writes call `validate()` before any store mutation.
//! - A completed save leaves no dangling child reference.
//! - A child row belongs to at most one stored parent; a save listing a child
//!   another parent owns fails before any write.

use crate::model::ids::ProfileId;
use crate::model::validation::ModelValidationError;
use crate::store::{CollectionKind, FlatStore, StoreError, WriteTx};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod document_repo;
pub mod exercise_log_repo;
pub mod group_log_repo;
mod graph;
pub mod set_repo;
pub mod workout_log_repo;

pub use document_repo::{Document, DocumentRepository, DOCUMENT_COLLECTIONS};
pub use exercise_log_repo::ExerciseLogRepository;
pub use group_log_repo::GroupLogRepository;
pub use set_repo::SetRepository;
pub use workout_log_repo::WorkoutLogRepository;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for aggregate persistence and hydration.
#[derive(Debug)]
pub enum RepoError {
    Validation(ModelValidationError),
    Store(StoreError),
    /// A saved parent references a child that does not resolve.
    DanglingReference {
        parent: CollectionKind,
        parent_id: String,
        child: CollectionKind,
        child_id: String,
    },
    /// A saved parent lists a child that another stored parent already owns.
    ChildClaimed {
        child: CollectionKind,
        child_id: String,
        owner: CollectionKind,
        owner_id: String,
    },
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::DanglingReference {
                parent,
                parent_id,
                child,
                child_id,
            } => write!(
                f,
                "{parent} row {parent_id} references missing {child} row {child_id}"
            ),
            Self::ChildClaimed {
                child,
                child_id,
                owner,
                owner_id,
            } => write!(f, "{child} row {child_id} already belongs to {owner} row {owner_id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::DanglingReference { .. } | Self::ChildClaimed { .. } => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<ModelValidationError> for RepoError {
    fn from(value: ModelValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<StoreError> for RepoError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Store(StoreError::from(value))
    }
}

/// Common contract of every repository in the workout hierarchy.
///
/// Implementors provide the participant forms (`save_in`, `delete_in`) and
/// the reads; the public `save`/`delete` wrap a participant call in exactly
/// one [`FlatStore::write`].
pub trait AggregateRepository {
    type Model;
    type Id: Copy + Display;

    fn store(&self) -> &FlatStore;

    /// Upserts `model` (and its subtree) inside the caller's write-scope.
    fn save_in(&self, tx: &WriteTx<'_>, model: &Self::Model) -> RepoResult<()>;

    /// Deletes one entity and its subtree inside the caller's write-scope.
    /// Returns `false` when nothing was stored under `id`.
    fn delete_in(&self, tx: &WriteTx<'_>, id: Self::Id) -> RepoResult<bool>;

    fn find_by_id(&self, id: Self::Id) -> RepoResult<Option<Self::Model>>;

    /// Batched lookup. Unresolved IDs are dropped; found entities keep the
    /// input order.
    fn find_by_ids(&self, ids: &[Self::Id]) -> RepoResult<Vec<Self::Model>>;

    fn find_all(&self, profile_id: ProfileId) -> RepoResult<Vec<Self::Model>>;

    /// Saves `model` in its own write-scope and hands it back.
    fn save(&self, model: Self::Model) -> RepoResult<Self::Model> {
        self.store().write(|tx| self.save_in(tx, &model))?;
        Ok(model)
    }

    /// Deletes `id` in its own write-scope. Deleting a missing ID is a no-op.
    fn delete(&self, id: Self::Id) -> RepoResult<bool> {
        self.store().write(|tx| self.delete_in(tx, id))
    }
}

/// Composition root: builds the repository hierarchy once over one store.
pub struct Repositories<'db> {
    store: &'db FlatStore,
    workouts: WorkoutLogRepository<'db>,
}

impl<'db> Repositories<'db> {
    pub fn new(store: &'db FlatStore) -> Self {
        Self {
            store,
            workouts: WorkoutLogRepository::new(store),
        }
    }

    pub fn store(&self) -> &'db FlatStore {
        self.store
    }

    pub fn workouts(&self) -> &WorkoutLogRepository<'db> {
        &self.workouts
    }

    pub fn groups(&self) -> &GroupLogRepository<'db> {
        self.workouts.groups()
    }

    pub fn exercise_logs(&self) -> &ExerciseLogRepository<'db> {
        self.workouts.groups().exercise_logs()
    }

    pub fn sets(&self) -> &SetRepository<'db> {
        self.exercise_logs().sets()
    }

    /// Opaque document repository for a sibling collection.
    pub fn documents(&self, kind: CollectionKind) -> RepoResult<DocumentRepository<'db>> {
        DocumentRepository::try_new(self.store, kind)
    }
}
