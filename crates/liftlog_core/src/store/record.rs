//! Typed view over a collection for serde-encoded records.

use super::{
    Collection, CollectionKind, CollectionMut, RowFilter, StoreError, StoreResult, StoredRow,
};
use crate::model::ids::ProfileId;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Display;
use std::marker::PhantomData;
use std::ops::Deref;

/// A flat row type stored as a JSON document in one collection.
pub trait Record: Serialize + DeserializeOwned {
    const COLLECTION: CollectionKind;
    type Id: Copy + Display;

    fn record_id(&self) -> Self::Id;
    fn record_profile_id(&self) -> ProfileId;
}

/// Typed read handle for the collection of `R`.
pub struct Records<'c, R> {
    collection: Collection<'c>,
    _record: PhantomData<fn() -> R>,
}

impl<'c, R: Record> Records<'c, R> {
    pub(crate) fn new(collection: Collection<'c>) -> Self {
        Self {
            collection,
            _record: PhantomData,
        }
    }

    pub fn get(&self, id: R::Id) -> StoreResult<Option<R>> {
        self.collection
            .get(&id.to_string())?
            .map(|row| decode::<R>(&row))
            .transpose()
    }

    /// Batched lookup aligned with `ids`; unresolved positions are `None`.
    pub fn bulk_get(&self, ids: &[R::Id]) -> StoreResult<Vec<Option<R>>> {
        let keys: Vec<String> = ids.iter().map(ToString::to_string).collect();
        self.collection
            .bulk_get(&keys)?
            .into_iter()
            .map(|row| row.map(|row| decode::<R>(&row)).transpose())
            .collect()
    }

    pub fn query(&self, filter: RowFilter) -> StoreResult<Vec<R>> {
        self.collection
            .query(filter)
            .fetch()?
            .iter()
            .map(decode::<R>)
            .collect()
    }

    pub fn count_existing(&self, ids: &[R::Id]) -> StoreResult<usize> {
        let keys: Vec<String> = ids.iter().map(ToString::to_string).collect();
        self.collection.count_existing(&keys)
    }
}

/// Typed read/write handle, only obtainable from a write-scope.
pub struct RecordsMut<'c, R> {
    records: Records<'c, R>,
}

impl<'c, R: Record> RecordsMut<'c, R> {
    pub(crate) fn new(records: Records<'c, R>) -> Self {
        Self { records }
    }

    /// Upserts `record` keyed by its ID.
    pub fn put(&self, record: &R) -> StoreResult<()> {
        let id = record.record_id().to_string();
        let body = serde_json::to_string(record).map_err(|err| StoreError::Codec {
            collection: R::COLLECTION.table(),
            id: id.clone(),
            message: err.to_string(),
        })?;
        CollectionMut::new(self.records.collection).put(
            &id,
            &record.record_profile_id().to_string(),
            &body,
        )
    }

    /// Deletes one record. Returns whether a row was removed.
    pub fn delete(&self, id: R::Id) -> StoreResult<bool> {
        CollectionMut::new(self.records.collection).delete(&id.to_string())
    }
}

impl<'c, R> Deref for RecordsMut<'c, R> {
    type Target = Records<'c, R>;

    fn deref(&self) -> &Self::Target {
        &self.records
    }
}

/// Decodes one stored row into `R`.
pub(crate) fn decode<R: Record>(row: &StoredRow) -> StoreResult<R> {
    serde_json::from_str(&row.body).map_err(|err| StoreError::Codec {
        collection: R::COLLECTION.table(),
        id: row.id.clone(),
        message: err.to_string(),
    })
}
