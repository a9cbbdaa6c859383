//! Parent -> child links stored as JSON ID arrays, and the reference queries
//! that maintenance and integrity checks run over them.
//!
//! # Invariants
//! - Link paths are compile-time constants; only they are spliced into SQL.

use super::{CollectionKind, StoreResult};
use crate::model::ids::ProfileId;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OptionalExtension};

/// Child IDs bound into one claim lookup.
const CLAIM_BATCH_SIZE: usize = 500;

/// One child-ID array inside a parent collection's body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildLink {
    pub parent: CollectionKind,
    pub child: CollectionKind,
    /// JSON path of the ID array inside the parent body.
    pub path: &'static str,
}

pub const WORKOUT_GROUPS: ChildLink = ChildLink {
    parent: CollectionKind::WorkoutLogs,
    child: CollectionKind::GroupLogs,
    path: "$.group_ids",
};

pub const GROUP_EXERCISES: ChildLink = ChildLink {
    parent: CollectionKind::GroupLogs,
    child: CollectionKind::ExerciseLogs,
    path: "$.exercise_ids",
};

pub const EXERCISE_SETS: ChildLink = ChildLink {
    parent: CollectionKind::ExerciseLogs,
    child: CollectionKind::PerformedSets,
    path: "$.set_ids",
};

/// Every link of the workout aggregate, root first.
pub const WORKOUT_LINKS: [ChildLink; 3] = [WORKOUT_GROUPS, GROUP_EXERCISES, EXERCISE_SETS];

/// A parent row pointing at a child row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRef {
    pub parent_id: String,
    pub child_id: String,
}

impl ChildLink {
    /// Child rows no parent row references, ordered by ID.
    pub fn unreferenced_child_ids(
        &self,
        conn: &Connection,
        profile_id: Option<ProfileId>,
    ) -> StoreResult<Vec<String>> {
        let mut sql = format!(
            "SELECT c.id
             FROM {child} c
             WHERE NOT EXISTS (
                SELECT 1
                FROM {parent} p, json_each(p.body, '{path}') j
                WHERE j.value = c.id
             )",
            child = self.child.table(),
            parent = self.parent.table(),
            path = self.path,
        );
        let mut bind_values = Vec::new();
        if let Some(profile_id) = profile_id {
            sql.push_str(" AND c.profile_id = ?");
            bind_values.push(Value::Text(profile_id.to_string()));
        }
        sql.push_str(" ORDER BY c.id ASC;");
        collect_strings(conn, &sql, bind_values)
    }

    /// First reference to any of `child_ids` held by a parent other than
    /// `parent_id`.
    pub fn foreign_claim(
        &self,
        conn: &Connection,
        parent_id: &str,
        child_ids: &[String],
    ) -> StoreResult<Option<LinkRef>> {
        for batch in child_ids.chunks(CLAIM_BATCH_SIZE) {
            let sql = format!(
                "SELECT p.id, j.value
                 FROM {parent} p, json_each(p.body, '{path}') j
                 WHERE p.id <> ? AND j.value IN ({placeholders})
                 ORDER BY p.id ASC, j.key ASC
                 LIMIT 1;",
                parent = self.parent.table(),
                path = self.path,
                placeholders = vec!["?"; batch.len()].join(", "),
            );
            let mut bind_values = vec![parent_id];
            bind_values.extend(batch.iter().map(String::as_str));
            let claim = conn
                .query_row(&sql, params_from_iter(bind_values), |row| {
                    Ok(LinkRef {
                        parent_id: row.get(0)?,
                        child_id: row.get(1)?,
                    })
                })
                .optional()?;
            if claim.is_some() {
                return Ok(claim);
            }
        }
        Ok(None)
    }

    /// References whose child row is absent.
    pub fn dangling_refs(&self, conn: &Connection) -> StoreResult<Vec<LinkRef>> {
        let sql = format!(
            "SELECT p.id, j.value
             FROM {parent} p, json_each(p.body, '{path}') j
             WHERE NOT EXISTS (SELECT 1 FROM {child} c WHERE c.id = j.value)
             ORDER BY p.id ASC, j.key ASC;",
            child = self.child.table(),
            parent = self.parent.table(),
            path = self.path,
        );
        collect_refs(conn, &sql)
    }

    /// References whose child row belongs to another profile than the parent.
    pub fn cross_profile_refs(&self, conn: &Connection) -> StoreResult<Vec<LinkRef>> {
        let sql = format!(
            "SELECT p.id, c.id
             FROM {parent} p, json_each(p.body, '{path}') j
             INNER JOIN {child} c ON c.id = j.value
             WHERE c.profile_id <> p.profile_id
             ORDER BY p.id ASC, j.key ASC;",
            child = self.child.table(),
            parent = self.parent.table(),
            path = self.path,
        );
        collect_refs(conn, &sql)
    }

    /// Child IDs referenced more than once, with their reference counts.
    pub fn shared_children(&self, conn: &Connection) -> StoreResult<Vec<(String, usize)>> {
        let sql = format!(
            "SELECT j.value, COUNT(*)
             FROM {parent} p, json_each(p.body, '{path}') j
             GROUP BY j.value
             HAVING COUNT(*) > 1
             ORDER BY j.value ASC;",
            parent = self.parent.table(),
            path = self.path,
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        let mut result = Vec::new();
        while let Some(row) = rows.next()? {
            let count: i64 = row.get(1)?;
            result.push((row.get(0)?, count as usize));
        }
        Ok(result)
    }
}

fn collect_strings(
    conn: &Connection,
    sql: &str,
    bind_values: Vec<Value>,
) -> StoreResult<Vec<String>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params_from_iter(bind_values))?;
    let mut result = Vec::new();
    while let Some(row) = rows.next()? {
        result.push(row.get(0)?);
    }
    Ok(result)
}

fn collect_refs(conn: &Connection, sql: &str) -> StoreResult<Vec<LinkRef>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query([])?;
    let mut result = Vec::new();
    while let Some(row) = rows.next()? {
        result.push(LinkRef {
            parent_id: row.get(0)?,
            child_id: row.get(1)?,
        });
    }
    Ok(result)
}
