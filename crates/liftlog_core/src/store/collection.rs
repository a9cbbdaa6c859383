//! Raw collection access: untyped rows keyed by ID.

use super::StoreResult;
use crate::model::ids::ProfileId;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::fmt::{Display, Formatter};
use std::ops::Deref;

/// Maximum IDs bound into one `IN (...)` lookup.
const LOOKUP_BATCH_SIZE: usize = 500;

const ROW_COLUMNS: &str = "id, profile_id, body, created_at, updated_at";

/// Every collection the store knows about. Table names come only from here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionKind {
    Profiles,
    Exercises,
    TrainingPlans,
    WorkoutLogs,
    GroupLogs,
    ExerciseLogs,
    PerformedSets,
    MaxLogs,
    BodyWeights,
    BodyMeasurements,
}

impl CollectionKind {
    pub const ALL: [CollectionKind; 10] = [
        Self::Profiles,
        Self::Exercises,
        Self::TrainingPlans,
        Self::WorkoutLogs,
        Self::GroupLogs,
        Self::ExerciseLogs,
        Self::PerformedSets,
        Self::MaxLogs,
        Self::BodyWeights,
        Self::BodyMeasurements,
    ];

    pub fn table(self) -> &'static str {
        match self {
            Self::Profiles => "profiles",
            Self::Exercises => "exercises",
            Self::TrainingPlans => "training_plans",
            Self::WorkoutLogs => "workout_logs",
            Self::GroupLogs => "performed_group_logs",
            Self::ExerciseLogs => "performed_exercise_logs",
            Self::PerformedSets => "performed_sets",
            Self::MaxLogs => "max_logs",
            Self::BodyWeights => "body_weights",
            Self::BodyMeasurements => "body_measurements",
        }
    }
}

impl Display for CollectionKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.table())
    }
}

/// One stored document as persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRow {
    pub id: String,
    pub profile_id: String,
    /// JSON document body.
    pub body: String,
    /// Epoch ms.
    pub created_at: i64,
    /// Epoch ms.
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq)]
enum FieldCondition {
    IsNull(&'static str),
    LessThan(&'static str, i64),
}

/// Row filter for [`Collection::query`].
///
/// Field conditions address JSON body fields by compile-time path (e.g.
/// `$.end_time`); a missing field and a JSON `null` both count as null.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowFilter {
    profile_id: Option<ProfileId>,
    conditions: Vec<FieldCondition>,
    limit: Option<u32>,
}

impl RowFilter {
    /// Matches every row.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_profile(profile_id: ProfileId) -> Self {
        Self::all().profile(Some(profile_id))
    }

    /// Restricts to one profile when `profile_id` is set.
    pub fn profile(mut self, profile_id: Option<ProfileId>) -> Self {
        self.profile_id = profile_id;
        self
    }

    pub fn field_is_null(mut self, path: &'static str) -> Self {
        self.conditions.push(FieldCondition::IsNull(path));
        self
    }

    pub fn field_lt(mut self, path: &'static str, value: i64) -> Self {
        self.conditions.push(FieldCondition::LessThan(path, value));
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    fn where_clause(&self) -> (String, Vec<Value>) {
        let mut sql = String::from(" WHERE 1 = 1");
        let mut bind_values = Vec::new();

        if let Some(profile_id) = self.profile_id {
            sql.push_str(" AND profile_id = ?");
            bind_values.push(Value::Text(profile_id.to_string()));
        }
        for condition in &self.conditions {
            match condition {
                // Expression indexes only match literal paths.
                FieldCondition::IsNull(path) => {
                    sql.push_str(&format!(" AND json_extract(body, '{path}') IS NULL"));
                }
                FieldCondition::LessThan(path, value) => {
                    sql.push_str(&format!(" AND json_extract(body, '{path}') < ?"));
                    bind_values.push(Value::Integer(*value));
                }
            }
        }
        (sql, bind_values)
    }
}

/// Read handle on one collection.
#[derive(Clone, Copy)]
pub struct Collection<'c> {
    conn: &'c Connection,
    kind: CollectionKind,
}

impl<'c> Collection<'c> {
    pub(crate) fn new(conn: &'c Connection, kind: CollectionKind) -> Self {
        Self { conn, kind }
    }

    pub fn kind(&self) -> CollectionKind {
        self.kind
    }

    pub fn get(&self, id: &str) -> StoreResult<Option<StoredRow>> {
        let row = self
            .conn
            .query_row(
                &format!(
                    "SELECT {ROW_COLUMNS} FROM {} WHERE id = ?1;",
                    self.kind.table()
                ),
                [id],
                parse_stored_row,
            )
            .optional()?;
        Ok(row)
    }

    /// Looks up many IDs at once.
    ///
    /// The result is aligned with `ids`: position `i` holds the row for
    /// `ids[i]` or `None` when it does not resolve.
    pub fn bulk_get(&self, ids: &[String]) -> StoreResult<Vec<Option<StoredRow>>> {
        let unique: Vec<&str> = ids
            .iter()
            .map(String::as_str)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut found: HashMap<String, StoredRow> = HashMap::with_capacity(unique.len());
        for batch in unique.chunks(LOOKUP_BATCH_SIZE) {
            let sql = format!(
                "SELECT {ROW_COLUMNS} FROM {} WHERE id IN ({});",
                self.kind.table(),
                placeholders(batch.len())
            );
            let mut stmt = self.conn.prepare(&sql)?;
            let mut rows = stmt.query(params_from_iter(batch.iter()))?;
            while let Some(row) = rows.next()? {
                let stored = parse_stored_row(row)?;
                found.insert(stored.id.clone(), stored);
            }
        }

        Ok(ids.iter().map(|id| found.get(id).cloned()).collect())
    }

    /// Counts how many of `ids` resolve to stored rows.
    pub fn count_existing(&self, ids: &[String]) -> StoreResult<usize> {
        let unique: Vec<&str> = ids
            .iter()
            .map(String::as_str)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut total = 0usize;
        for batch in unique.chunks(LOOKUP_BATCH_SIZE) {
            let sql = format!(
                "SELECT COUNT(*) FROM {} WHERE id IN ({});",
                self.kind.table(),
                placeholders(batch.len())
            );
            let count: i64 =
                self.conn
                    .query_row(&sql, params_from_iter(batch.iter()), |row| row.get(0))?;
            total += count as usize;
        }
        Ok(total)
    }

    /// Starts a filtered query; nothing runs until a fetch method is called.
    pub fn query(&self, filter: RowFilter) -> Query<'c> {
        Query {
            collection: *self,
            filter,
        }
    }
}

/// Pending filtered query over one collection. Rows come back ordered by ID.
pub struct Query<'c> {
    collection: Collection<'c>,
    filter: RowFilter,
}

impl Query<'_> {
    pub fn fetch(&self) -> StoreResult<Vec<StoredRow>> {
        let (sql, bind_values) = self.select_sql(ROW_COLUMNS);
        let mut stmt = self.collection.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut result = Vec::new();
        while let Some(row) = rows.next()? {
            result.push(parse_stored_row(row)?);
        }
        Ok(result)
    }

    pub fn fetch_ids(&self) -> StoreResult<Vec<String>> {
        let (sql, bind_values) = self.select_sql("id");
        let mut stmt = self.collection.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut result = Vec::new();
        while let Some(row) = rows.next()? {
            result.push(row.get(0)?);
        }
        Ok(result)
    }

    pub fn count(&self) -> StoreResult<usize> {
        let (where_sql, bind_values) = self.filter.where_clause();
        let sql = format!(
            "SELECT COUNT(*) FROM (SELECT id FROM {}{where_sql}{});",
            self.collection.kind.table(),
            limit_clause(self.filter.limit)
        );
        let count: i64 =
            self.collection
                .conn
                .query_row(&sql, params_from_iter(bind_values), |row| row.get(0))?;
        Ok(count as usize)
    }

    fn select_sql(&self, columns: &str) -> (String, Vec<Value>) {
        let (where_sql, bind_values) = self.filter.where_clause();
        let sql = format!(
            "SELECT {columns} FROM {}{where_sql} ORDER BY id ASC{};",
            self.collection.kind.table(),
            limit_clause(self.filter.limit)
        );
        (sql, bind_values)
    }
}

/// Read/write handle on one collection, only obtainable from a write-scope.
pub struct CollectionMut<'c> {
    inner: Collection<'c>,
}

impl<'c> CollectionMut<'c> {
    pub(crate) fn new(inner: Collection<'c>) -> Self {
        Self { inner }
    }

    /// Upserts one row keyed by `id`.
    pub fn put(&self, id: &str, profile_id: &str, body: &str) -> StoreResult<()> {
        self.inner.conn.execute(
            &format!(
                "INSERT INTO {} (id, profile_id, body)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET
                    profile_id = excluded.profile_id,
                    body = excluded.body,
                    updated_at = (strftime('%s', 'now') * 1000);",
                self.inner.kind.table()
            ),
            params![id, profile_id, body],
        )?;
        Ok(())
    }

    /// Deletes one row. Returns whether a row was removed.
    pub fn delete(&self, id: &str) -> StoreResult<bool> {
        let changed = self.inner.conn.execute(
            &format!("DELETE FROM {} WHERE id = ?1;", self.inner.kind.table()),
            [id],
        )?;
        Ok(changed > 0)
    }
}

impl<'c> Deref for CollectionMut<'c> {
    type Target = Collection<'c>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

fn parse_stored_row(row: &Row<'_>) -> rusqlite::Result<StoredRow> {
    Ok(StoredRow {
        id: row.get("id")?,
        profile_id: row.get("profile_id")?,
        body: row.get("body")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

fn limit_clause(limit: Option<u32>) -> String {
    limit.map_or_else(String::new, |limit| format!(" LIMIT {limit}"))
}
