//! Exercise log repository: cascades to the set repository.
//!
//! # Invariants
//! - The stored row holds `set_ids` in the in-memory order of `sets`.
//! - Sets dropped from a log since its last save are deleted on re-save.

use super::graph::{
    child_id_union, dropped_ids, ensure_resolved, ensure_unclaimed, in_stored_order, index_by_id,
};
use super::{AggregateRepository, RepoResult, SetRepository};
use crate::model::exercise_log::{PerformedExerciseLog, PerformedExerciseLogRow};
use crate::model::ids::{PerformedExerciseLogId, ProfileId};
use crate::model::performed_set::PerformedSet;
use crate::model::validation::ModelValidationError;
use crate::store::links::EXERCISE_SETS;
use crate::store::{CollectionKind, FlatStore, Record, RowFilter, WriteTx};

impl Record for PerformedExerciseLogRow {
    const COLLECTION: CollectionKind = CollectionKind::ExerciseLogs;
    type Id = PerformedExerciseLogId;

    fn record_id(&self) -> PerformedExerciseLogId {
        self.id
    }

    fn record_profile_id(&self) -> ProfileId {
        self.profile_id
    }
}

pub struct ExerciseLogRepository<'db> {
    store: &'db FlatStore,
    sets: SetRepository<'db>,
}

impl<'db> ExerciseLogRepository<'db> {
    pub fn new(store: &'db FlatStore) -> Self {
        Self {
            store,
            sets: SetRepository::new(store),
        }
    }

    pub fn sets(&self) -> &SetRepository<'db> {
        &self.sets
    }

    fn hydrate_rows(
        &self,
        rows: Vec<PerformedExerciseLogRow>,
    ) -> RepoResult<Vec<PerformedExerciseLog>> {
        let set_ids = child_id_union(&rows, |row| row.set_ids.as_slice());
        let sets = index_by_id(self.sets.find_by_ids(&set_ids)?, |set| set.id);
        Ok(rows
            .into_iter()
            .map(|row| {
                let ordered = in_stored_order(&row.set_ids, &sets);
                PerformedExerciseLog::hydrate(row, ordered)
            })
            .collect())
    }
}

impl AggregateRepository for ExerciseLogRepository<'_> {
    type Model = PerformedExerciseLog;
    type Id = PerformedExerciseLogId;

    fn store(&self) -> &FlatStore {
        self.store
    }

    fn save_in(&self, tx: &WriteTx<'_>, log: &PerformedExerciseLog) -> RepoResult<()> {
        log.validate()?;
        let row = log.to_row();
        let records = tx.records::<PerformedExerciseLogRow>();

        if let Some(previous) = records.get(log.id)? {
            if previous.profile_id != log.profile_id {
                return Err(ModelValidationError::ProfileMismatch {
                    entity: "performed exercise log",
                    id: log.id.to_string(),
                    expected: previous.profile_id,
                    actual: log.profile_id,
                }
                .into());
            }
            for set_id in dropped_ids(&previous.set_ids, &row.set_ids) {
                self.sets.delete_in(tx, set_id)?;
            }
        }

        ensure_unclaimed(tx, EXERCISE_SETS, log.id, &row.set_ids)?;
        records.put(&row)?;
        for set in &log.sets {
            self.sets.save_in(tx, set)?;
        }
        ensure_resolved(
            &*tx.records::<PerformedSet>(),
            CollectionKind::ExerciseLogs,
            log.id,
            &row.set_ids,
        )
    }

    fn delete_in(&self, tx: &WriteTx<'_>, id: PerformedExerciseLogId) -> RepoResult<bool> {
        let records = tx.records::<PerformedExerciseLogRow>();
        let Some(row) = records.get(id)? else {
            return Ok(false);
        };
        for set_id in row.set_ids {
            self.sets.delete_in(tx, set_id)?;
        }
        Ok(records.delete(id)?)
    }

    fn find_by_id(&self, id: PerformedExerciseLogId) -> RepoResult<Option<PerformedExerciseLog>> {
        Ok(self.find_by_ids(&[id])?.pop())
    }

    fn find_by_ids(&self, ids: &[PerformedExerciseLogId]) -> RepoResult<Vec<PerformedExerciseLog>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = self
            .store
            .records::<PerformedExerciseLogRow>()
            .bulk_get(ids)?;
        self.hydrate_rows(rows.into_iter().flatten().collect())
    }

    fn find_all(&self, profile_id: ProfileId) -> RepoResult<Vec<PerformedExerciseLog>> {
        let rows = self
            .store
            .records::<PerformedExerciseLogRow>()
            .query(RowFilter::for_profile(profile_id))?;
        self.hydrate_rows(rows)
    }
}
