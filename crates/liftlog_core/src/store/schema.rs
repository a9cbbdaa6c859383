//! Readiness checks run before a connection is used as a flat store.

use super::{CollectionKind, StoreError, StoreResult};
use crate::db::migrations::{current_user_version, latest_version};
use rusqlite::Connection;

const REQUIRED_COLUMNS: [&str; 5] = ["id", "profile_id", "body", "created_at", "updated_at"];

/// Verifies the schema version and that every collection table has the
/// document layout.
pub fn ensure_schema_ready(conn: &Connection) -> StoreResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version != expected_version {
        return Err(StoreError::SchemaNotReady {
            expected_version,
            actual_version,
        });
    }

    for kind in CollectionKind::ALL {
        let columns = table_columns(conn, kind.table())?;
        if columns.is_empty() {
            return Err(StoreError::MissingCollection(kind.table()));
        }
        if REQUIRED_COLUMNS
            .iter()
            .any(|required| !columns.iter().any(|column| column == required))
        {
            return Err(StoreError::MissingCollection(kind.table()));
        }
    }

    Ok(())
}

fn table_columns(conn: &Connection, table: &str) -> StoreResult<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    let mut columns = Vec::new();
    while let Some(row) = rows.next()? {
        columns.push(row.get(1)?);
    }
    Ok(columns)
}
