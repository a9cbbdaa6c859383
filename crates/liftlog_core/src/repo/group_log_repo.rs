//! Group log repository: cascades to the exercise log repository.

use super::graph::{
    child_id_union, dropped_ids, ensure_resolved, ensure_unclaimed, in_stored_order, index_by_id,
};
use super::{AggregateRepository, ExerciseLogRepository, RepoResult};
use crate::model::exercise_log::PerformedExerciseLogRow;
use crate::model::group_log::{PerformedGroupLog, PerformedGroupLogRow};
use crate::model::ids::{PerformedGroupLogId, ProfileId};
use crate::model::validation::ModelValidationError;
use crate::store::links::GROUP_EXERCISES;
use crate::store::{CollectionKind, FlatStore, Record, RowFilter, WriteTx};

impl Record for PerformedGroupLogRow {
    const COLLECTION: CollectionKind = CollectionKind::GroupLogs;
    type Id = PerformedGroupLogId;

    fn record_id(&self) -> PerformedGroupLogId {
        self.id
    }

    fn record_profile_id(&self) -> ProfileId {
        self.profile_id
    }
}

pub struct GroupLogRepository<'db> {
    store: &'db FlatStore,
    exercise_logs: ExerciseLogRepository<'db>,
}

impl<'db> GroupLogRepository<'db> {
    pub fn new(store: &'db FlatStore) -> Self {
        Self {
            store,
            exercise_logs: ExerciseLogRepository::new(store),
        }
    }

    pub fn exercise_logs(&self) -> &ExerciseLogRepository<'db> {
        &self.exercise_logs
    }

    fn hydrate_rows(&self, rows: Vec<PerformedGroupLogRow>) -> RepoResult<Vec<PerformedGroupLog>> {
        let exercise_ids = child_id_union(&rows, |row| row.exercise_ids.as_slice());
        let exercises = index_by_id(
            self.exercise_logs.find_by_ids(&exercise_ids)?,
            |exercise| exercise.id,
        );
        Ok(rows
            .into_iter()
            .map(|row| {
                let ordered = in_stored_order(&row.exercise_ids, &exercises);
                PerformedGroupLog::hydrate(row, ordered)
            })
            .collect())
    }
}

impl AggregateRepository for GroupLogRepository<'_> {
    type Model = PerformedGroupLog;
    type Id = PerformedGroupLogId;

    fn store(&self) -> &FlatStore {
        self.store
    }

    fn save_in(&self, tx: &WriteTx<'_>, group: &PerformedGroupLog) -> RepoResult<()> {
        group.validate()?;
        let row = group.to_row();
        let records = tx.records::<PerformedGroupLogRow>();

        if let Some(previous) = records.get(group.id)? {
            if previous.profile_id != group.profile_id {
                return Err(ModelValidationError::ProfileMismatch {
                    entity: "performed group log",
                    id: group.id.to_string(),
                    expected: previous.profile_id,
                    actual: group.profile_id,
                }
                .into());
            }
            for exercise_id in dropped_ids(&previous.exercise_ids, &row.exercise_ids) {
                self.exercise_logs.delete_in(tx, exercise_id)?;
            }
        }

        ensure_unclaimed(tx, GROUP_EXERCISES, group.id, &row.exercise_ids)?;
        records.put(&row)?;
        for exercise in &group.exercises {
            self.exercise_logs.save_in(tx, exercise)?;
        }
        ensure_resolved(
            &*tx.records::<PerformedExerciseLogRow>(),
            CollectionKind::GroupLogs,
            group.id,
            &row.exercise_ids,
        )
    }

    fn delete_in(&self, tx: &WriteTx<'_>, id: PerformedGroupLogId) -> RepoResult<bool> {
        let records = tx.records::<PerformedGroupLogRow>();
        let Some(row) = records.get(id)? else {
            return Ok(false);
        };
        for exercise_id in row.exercise_ids {
            self.exercise_logs.delete_in(tx, exercise_id)?;
        }
        Ok(records.delete(id)?)
    }

    fn find_by_id(&self, id: PerformedGroupLogId) -> RepoResult<Option<PerformedGroupLog>> {
        Ok(self.find_by_ids(&[id])?.pop())
    }

    fn find_by_ids(&self, ids: &[PerformedGroupLogId]) -> RepoResult<Vec<PerformedGroupLog>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = self.store.records::<PerformedGroupLogRow>().bulk_get(ids)?;
        self.hydrate_rows(rows.into_iter().flatten().collect())
    }

    fn find_all(&self, profile_id: ProfileId) -> RepoResult<Vec<PerformedGroupLog>> {
        let rows = self
            .store
            .records::<PerformedGroupLogRow>()
            .query(RowFilter::for_profile(profile_id))?;
        self.hydrate_rows(rows)
    }
}
