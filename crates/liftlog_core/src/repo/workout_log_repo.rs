//! Workout log repository: the aggregate root entry point.
//!
//! # Responsibility
//! - Save, hydrate and cascade-delete full four-level workout trees.
//! - Provide the start-time queries maintenance uses for retention.
//!
//! # Invariants
//! - One public `save`/`delete` call opens exactly one write-scope for the
//!   whole tree.
//! - A failure anywhere in the tree rolls back every write of that call.

use super::graph::{
    child_id_union, dropped_ids, ensure_resolved, ensure_unclaimed, in_stored_order, index_by_id,
};
use super::{AggregateRepository, GroupLogRepository, RepoResult};
use crate::model::group_log::PerformedGroupLogRow;
use crate::model::ids::{ProfileId, WorkoutLogId};
use crate::model::validation::ModelValidationError;
use crate::model::workout_log::{WorkoutLog, WorkoutLogRow};
use crate::store::links::WORKOUT_GROUPS;
use crate::store::{CollectionKind, FlatStore, Record, RowFilter, WriteTx};

const START_TIME_PATH: &str = "$.start_time";
const END_TIME_PATH: &str = "$.end_time";

impl Record for WorkoutLogRow {
    const COLLECTION: CollectionKind = CollectionKind::WorkoutLogs;
    type Id = WorkoutLogId;

    fn record_id(&self) -> WorkoutLogId {
        self.id
    }

    fn record_profile_id(&self) -> ProfileId {
        self.profile_id
    }
}

/// Workouts whose start time is earlier than `cutoff_ms`.
pub fn started_before(cutoff_ms: i64) -> RowFilter {
    RowFilter::all().field_lt(START_TIME_PATH, cutoff_ms)
}

/// Workouts with no end time whose start time is earlier than `cutoff_ms`.
pub fn unfinished_started_before(cutoff_ms: i64) -> RowFilter {
    started_before(cutoff_ms).field_is_null(END_TIME_PATH)
}

pub struct WorkoutLogRepository<'db> {
    store: &'db FlatStore,
    groups: GroupLogRepository<'db>,
}

impl<'db> WorkoutLogRepository<'db> {
    pub fn new(store: &'db FlatStore) -> Self {
        Self {
            store,
            groups: GroupLogRepository::new(store),
        }
    }

    pub fn groups(&self) -> &GroupLogRepository<'db> {
        &self.groups
    }

    pub fn find_started_before(
        &self,
        cutoff_ms: i64,
        profile_id: Option<ProfileId>,
    ) -> RepoResult<Vec<WorkoutLog>> {
        self.find_matching(started_before(cutoff_ms).profile(profile_id))
    }

    pub fn find_unfinished_started_before(
        &self,
        cutoff_ms: i64,
        profile_id: Option<ProfileId>,
    ) -> RepoResult<Vec<WorkoutLog>> {
        self.find_matching(unfinished_started_before(cutoff_ms).profile(profile_id))
    }

    fn find_matching(&self, filter: RowFilter) -> RepoResult<Vec<WorkoutLog>> {
        let rows = self.store.records::<WorkoutLogRow>().query(filter)?;
        self.hydrate_rows(rows)
    }

    fn hydrate_rows(&self, rows: Vec<WorkoutLogRow>) -> RepoResult<Vec<WorkoutLog>> {
        let group_ids = child_id_union(&rows, |row| row.group_ids.as_slice());
        let groups = index_by_id(self.groups.find_by_ids(&group_ids)?, |group| group.id);
        Ok(rows
            .into_iter()
            .map(|row| {
                let ordered = in_stored_order(&row.group_ids, &groups);
                WorkoutLog::hydrate(row, ordered)
            })
            .collect())
    }
}

impl AggregateRepository for WorkoutLogRepository<'_> {
    type Model = WorkoutLog;
    type Id = WorkoutLogId;

    fn store(&self) -> &FlatStore {
        self.store
    }

    fn save_in(&self, tx: &WriteTx<'_>, workout: &WorkoutLog) -> RepoResult<()> {
        workout.validate()?;
        let row = workout.to_row();
        let records = tx.records::<WorkoutLogRow>();

        if let Some(previous) = records.get(workout.id)? {
            if previous.profile_id != workout.profile_id {
                return Err(ModelValidationError::ProfileMismatch {
                    entity: "workout log",
                    id: workout.id.to_string(),
                    expected: previous.profile_id,
                    actual: workout.profile_id,
                }
                .into());
            }
            for group_id in dropped_ids(&previous.group_ids, &row.group_ids) {
                self.groups.delete_in(tx, group_id)?;
            }
        }

        ensure_unclaimed(tx, WORKOUT_GROUPS, workout.id, &row.group_ids)?;
        records.put(&row)?;
        for group in &workout.groups {
            self.groups.save_in(tx, group)?;
        }
        ensure_resolved(
            &*tx.records::<PerformedGroupLogRow>(),
            CollectionKind::WorkoutLogs,
            workout.id,
            &row.group_ids,
        )
    }

    fn delete_in(&self, tx: &WriteTx<'_>, id: WorkoutLogId) -> RepoResult<bool> {
        let records = tx.records::<WorkoutLogRow>();
        let Some(row) = records.get(id)? else {
            return Ok(false);
        };
        for group_id in row.group_ids {
            self.groups.delete_in(tx, group_id)?;
        }
        Ok(records.delete(id)?)
    }

    fn find_by_id(&self, id: WorkoutLogId) -> RepoResult<Option<WorkoutLog>> {
        Ok(self.find_by_ids(&[id])?.pop())
    }

    fn find_by_ids(&self, ids: &[WorkoutLogId]) -> RepoResult<Vec<WorkoutLog>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = self.store.records::<WorkoutLogRow>().bulk_get(ids)?;
        self.hydrate_rows(rows.into_iter().flatten().collect())
    }

    fn find_all(&self, profile_id: ProfileId) -> RepoResult<Vec<WorkoutLog>> {
        self.find_matching(RowFilter::for_profile(profile_id))
    }
}
