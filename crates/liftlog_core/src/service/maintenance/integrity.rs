//! Read-only integrity validation.
//!
//! # Invariants
//! - Never mutates data; findings are reported, not repaired.

use crate::model::exercise_log::PerformedExerciseLogRow;
use crate::model::group_log::PerformedGroupLogRow;
use crate::model::performed_set::PerformedSet;
use crate::model::workout_log::WorkoutLogRow;
use crate::repo::DOCUMENT_COLLECTIONS;
use crate::store::links::WORKOUT_LINKS;
use crate::store::{CollectionKind, FlatStore, Record, RowFilter, StoreResult};
use serde::Serialize;
use std::time::Instant;

/// One finding of [`check`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntegrityIssue {
    /// A parent references a child row that does not exist.
    DanglingReference {
        parent: CollectionKind,
        parent_id: String,
        child: CollectionKind,
        child_id: String,
    },
    /// A child row no parent references.
    OrphanedRow { collection: CollectionKind, id: String },
    /// A child row referenced by more than one parent entry.
    SharedChild {
        collection: CollectionKind,
        id: String,
        references: usize,
    },
    /// A parent contains a child of another profile.
    CrossProfile {
        parent: CollectionKind,
        parent_id: String,
        child: CollectionKind,
        child_id: String,
    },
    /// A stored body does not decode to its collection's shape.
    UndecodableRow {
        collection: CollectionKind,
        id: String,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntegrityReport {
    /// Output of `PRAGMA integrity_check`; `["ok"]` for a sound file.
    pub sqlite_messages: Vec<String>,
    pub rows_checked: usize,
    pub issues: Vec<IntegrityIssue>,
    pub duration_ms: u64,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty() && self.sqlite_messages.iter().all(|message| message == "ok")
    }
}

/// Runs every structural check over the whole store.
pub(crate) fn check(store: &FlatStore) -> StoreResult<IntegrityReport> {
    let started_at = Instant::now();
    let conn = store.connection();
    let sqlite_messages = sqlite_integrity_messages(store)?;

    let mut rows_checked = 0usize;
    for kind in CollectionKind::ALL {
        rows_checked += store.collection(kind).query(RowFilter::all()).count()?;
    }

    let mut issues = Vec::new();
    for link in WORKOUT_LINKS {
        for dangling in link.dangling_refs(conn)? {
            issues.push(IntegrityIssue::DanglingReference {
                parent: link.parent,
                parent_id: dangling.parent_id,
                child: link.child,
                child_id: dangling.child_id,
            });
        }
        for id in link.unreferenced_child_ids(conn, None)? {
            issues.push(IntegrityIssue::OrphanedRow {
                collection: link.child,
                id,
            });
        }
        for (id, references) in link.shared_children(conn)? {
            issues.push(IntegrityIssue::SharedChild {
                collection: link.child,
                id,
                references,
            });
        }
        for mismatch in link.cross_profile_refs(conn)? {
            issues.push(IntegrityIssue::CrossProfile {
                parent: link.parent,
                parent_id: mismatch.parent_id,
                child: link.child,
                child_id: mismatch.child_id,
            });
        }
    }

    issues.extend(undecodable_records::<WorkoutLogRow>(store)?);
    issues.extend(undecodable_records::<PerformedGroupLogRow>(store)?);
    issues.extend(undecodable_records::<PerformedExerciseLogRow>(store)?);
    issues.extend(undecodable_records::<PerformedSet>(store)?);
    for kind in DOCUMENT_COLLECTIONS {
        issues.extend(non_object_documents(store, kind)?);
    }

    Ok(IntegrityReport {
        sqlite_messages,
        rows_checked,
        issues,
        duration_ms: started_at.elapsed().as_millis() as u64,
    })
}

fn sqlite_integrity_messages(store: &FlatStore) -> StoreResult<Vec<String>> {
    let mut stmt = store.connection().prepare("PRAGMA integrity_check;")?;
    let mut rows = stmt.query([])?;
    let mut messages = Vec::new();
    while let Some(row) = rows.next()? {
        messages.push(row.get(0)?);
    }
    Ok(messages)
}

fn undecodable_records<R: Record>(store: &FlatStore) -> StoreResult<Vec<IntegrityIssue>> {
    let rows = store.collection(R::COLLECTION).query(RowFilter::all()).fetch()?;
    Ok(rows
        .into_iter()
        .filter_map(|row| {
            serde_json::from_str::<R>(&row.body)
                .err()
                .map(|err| IntegrityIssue::UndecodableRow {
                    collection: R::COLLECTION,
                    id: row.id,
                    message: err.to_string(),
                })
        })
        .collect())
}

fn non_object_documents(
    store: &FlatStore,
    kind: CollectionKind,
) -> StoreResult<Vec<IntegrityIssue>> {
    let rows = store.collection(kind).query(RowFilter::all()).fetch()?;
    Ok(rows
        .into_iter()
        .filter_map(|row| {
            match serde_json::from_str::<serde_json::Value>(&row.body) {
                Ok(body) if body.is_object() => None,
                Ok(_) => Some("document body is not a JSON object".to_string()),
                Err(err) => Some(err.to_string()),
            }
            .map(|message| IntegrityIssue::UndecodableRow {
                collection: kind,
                id: row.id,
                message,
            })
        })
        .collect())
}
