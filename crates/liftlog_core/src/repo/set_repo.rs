//! Leaf repository for performed sets.

use super::{AggregateRepository, RepoResult};
use crate::model::ids::{ProfileId, SetId};
use crate::model::performed_set::PerformedSet;
use crate::store::{CollectionKind, FlatStore, Record, RowFilter, WriteTx};

impl Record for PerformedSet {
    const COLLECTION: CollectionKind = CollectionKind::PerformedSets;
    type Id = SetId;

    fn record_id(&self) -> SetId {
        self.id
    }

    fn record_profile_id(&self) -> ProfileId {
        self.profile_id
    }
}

/// Atomic CRUD for [`PerformedSet`]; a set is stored as-is.
pub struct SetRepository<'db> {
    store: &'db FlatStore,
}

impl<'db> SetRepository<'db> {
    pub fn new(store: &'db FlatStore) -> Self {
        Self { store }
    }
}

impl AggregateRepository for SetRepository<'_> {
    type Model = PerformedSet;
    type Id = SetId;

    fn store(&self) -> &FlatStore {
        self.store
    }

    fn save_in(&self, tx: &WriteTx<'_>, set: &PerformedSet) -> RepoResult<()> {
        set.validate()?;
        tx.records::<PerformedSet>().put(set)?;
        Ok(())
    }

    fn delete_in(&self, tx: &WriteTx<'_>, id: SetId) -> RepoResult<bool> {
        Ok(tx.records::<PerformedSet>().delete(id)?)
    }

    fn find_by_id(&self, id: SetId) -> RepoResult<Option<PerformedSet>> {
        Ok(self.store.records::<PerformedSet>().get(id)?)
    }

    fn find_by_ids(&self, ids: &[SetId]) -> RepoResult<Vec<PerformedSet>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let found = self.store.records::<PerformedSet>().bulk_get(ids)?;
        Ok(found.into_iter().flatten().collect())
    }

    fn find_all(&self, profile_id: ProfileId) -> RepoResult<Vec<PerformedSet>> {
        Ok(self
            .store
            .records::<PerformedSet>()
            .query(RowFilter::for_profile(profile_id))?)
    }
}
