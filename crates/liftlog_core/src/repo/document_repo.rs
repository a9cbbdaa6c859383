//! Opaque JSON document repository for the sibling collections (profiles,
//! exercises, training plans, maxes, body metrics).
//!
//! # Invariants
//! - Only collections in [`DOCUMENT_COLLECTIONS`] are accepted.
//! - Document bodies are JSON objects.

use super::{AggregateRepository, RepoError, RepoResult};
use crate::model::ids::ProfileId;
use crate::store::{CollectionKind, FlatStore, RowFilter, StoredRow, WriteTx};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Collections handled as opaque documents.
pub const DOCUMENT_COLLECTIONS: [CollectionKind; 6] = [
    CollectionKind::Profiles,
    CollectionKind::Exercises,
    CollectionKind::TrainingPlans,
    CollectionKind::MaxLogs,
    CollectionKind::BodyWeights,
    CollectionKind::BodyMeasurements,
];

/// One profile-scoped document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub profile_id: ProfileId,
    pub body: serde_json::Value,
}

impl Document {
    pub fn new(profile_id: ProfileId, body: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            profile_id,
            body,
        }
    }
}

pub struct DocumentRepository<'db> {
    store: &'db FlatStore,
    kind: CollectionKind,
}

impl<'db> DocumentRepository<'db> {
    /// Builds a repository for one document collection.
    ///
    /// # Errors
    /// - [`RepoError::InvalidData`] when `kind` belongs to the workout aggregate.
    pub fn try_new(store: &'db FlatStore, kind: CollectionKind) -> RepoResult<Self> {
        if !DOCUMENT_COLLECTIONS.contains(&kind) {
            return Err(RepoError::InvalidData(format!(
                "{kind} is not a document collection"
            )));
        }
        Ok(Self { store, kind })
    }

    pub fn kind(&self) -> CollectionKind {
        self.kind
    }

    fn parse_row(&self, row: StoredRow) -> RepoResult<Document> {
        let id = Uuid::parse_str(&row.id).map_err(|err| {
            RepoError::InvalidData(format!("{} id `{}`: {err}", self.kind, row.id))
        })?;
        let profile_id = row.profile_id.parse::<ProfileId>().map_err(|err| {
            RepoError::InvalidData(format!(
                "{} row {} profile id `{}`: {err}",
                self.kind, row.id, row.profile_id
            ))
        })?;
        let body = serde_json::from_str(&row.body).map_err(|err| {
            RepoError::InvalidData(format!("{} row {} body: {err}", self.kind, row.id))
        })?;
        Ok(Document {
            id,
            profile_id,
            body,
        })
    }
}

impl AggregateRepository for DocumentRepository<'_> {
    type Model = Document;
    type Id = Uuid;

    fn store(&self) -> &FlatStore {
        self.store
    }

    fn save_in(&self, tx: &WriteTx<'_>, document: &Document) -> RepoResult<()> {
        if !document.body.is_object() {
            return Err(RepoError::InvalidData(format!(
                "{} document {} body must be a JSON object",
                self.kind, document.id
            )));
        }
        let body = document.body.to_string();
        tx.collection(self.kind).put(
            &document.id.to_string(),
            &document.profile_id.to_string(),
            &body,
        )?;
        Ok(())
    }

    fn delete_in(&self, tx: &WriteTx<'_>, id: Uuid) -> RepoResult<bool> {
        Ok(tx.collection(self.kind).delete(&id.to_string())?)
    }

    fn find_by_id(&self, id: Uuid) -> RepoResult<Option<Document>> {
        self.store
            .collection(self.kind)
            .get(&id.to_string())?
            .map(|row| self.parse_row(row))
            .transpose()
    }

    fn find_by_ids(&self, ids: &[Uuid]) -> RepoResult<Vec<Document>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let keys: Vec<String> = ids.iter().map(ToString::to_string).collect();
        self.store
            .collection(self.kind)
            .bulk_get(&keys)?
            .into_iter()
            .flatten()
            .map(|row| self.parse_row(row))
            .collect()
    }

    fn find_all(&self, profile_id: ProfileId) -> RepoResult<Vec<Document>> {
        self.store
            .collection(self.kind)
            .query(RowFilter::for_profile(profile_id))
            .fetch()?
            .into_iter()
            .map(|row| self.parse_row(row))
            .collect()
    }
}
