//! Flat document-collection store over SQLite.
//!
//! # Responsibility
//! - Expose per-collection `get`/`bulk_get`/`query`/`put`/`delete`.
//! - Own the single `write(fn)` primitive that opens one write-scope.
//!
//! # Invariants
//! - Mutations are only reachable through a [`WriteTx`], and a `WriteTx` only
//!   exists inside [`FlatStore::write`].
//! - `write` is not re-entrant: calling it while a scope is open fails with
//!   [`StoreError::NestedWriteScope`] instead of opening a second boundary.
//! - A scope commits when its closure returns `Ok` and rolls back otherwise.

use crate::db::{open_db, open_db_in_memory, DbError};
use log::{debug, warn};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::cell::Cell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::time::Instant;

mod collection;
pub mod links;
mod record;
mod schema;

pub use collection::{Collection, CollectionKind, CollectionMut, Query, RowFilter, StoredRow};
pub use record::{Record, Records, RecordsMut};
pub use schema::ensure_schema_ready;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug)]
pub enum StoreError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// `write` was called while another write-scope is open on this store.
    NestedWriteScope,
    /// A stored body cannot be converted to or from its record type.
    Codec {
        collection: &'static str,
        id: String,
        message: String,
    },
    /// Connection schema is not at the expected migrated version.
    SchemaNotReady {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required collection table is missing.
    MissingCollection(&'static str),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NestedWriteScope => {
                write!(f, "a write-scope is already open on this store")
            }
            Self::Codec {
                collection,
                id,
                message,
            } => write!(f, "cannot decode {collection} row {id}: {message}"),
            Self::SchemaNotReady {
                expected_version,
                actual_version,
            } => write!(
                f,
                "store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingCollection(table) => {
                write!(f, "store requires collection table `{table}`")
            }
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Single-writer flat store owning one SQLite connection.
pub struct FlatStore {
    conn: Connection,
    write_scopes: Cell<u64>,
}

impl FlatStore {
    /// Opens (creating if needed) and migrates a database file.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::try_new(open_db(path)?)
    }

    /// Opens a fresh migrated in-memory database.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::try_new(open_db_in_memory()?)
    }

    /// Wraps an already migrated connection.
    pub fn try_new(conn: Connection) -> StoreResult<Self> {
        ensure_schema_ready(&conn)?;
        Ok(Self {
            conn,
            write_scopes: Cell::new(0),
        })
    }

    /// Raw connection for diagnostics and maintenance pragmas.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Read access to one collection.
    ///
    /// Reads issued while a write-scope is open see that scope's uncommitted
    /// writes, since both share this store's connection.
    pub fn collection(&self, kind: CollectionKind) -> Collection<'_> {
        Collection::new(&self.conn, kind)
    }

    /// Typed read access to the collection of `R`.
    pub fn records<R: Record>(&self) -> Records<'_, R> {
        Records::new(self.collection(R::COLLECTION))
    }

    /// Whether a write-scope is currently open on this store.
    pub fn in_write_scope(&self) -> bool {
        !self.conn.is_autocommit()
    }

    /// Number of write-scopes opened since this store was created.
    pub fn write_scope_count(&self) -> u64 {
        self.write_scopes.get()
    }

    /// Runs `f` inside exactly one write-scope.
    ///
    /// # Errors
    /// - [`StoreError::NestedWriteScope`] when a scope is already open.
    /// - Any error returned by `f`; the scope is rolled back first.
    /// - Begin/commit failures from SQLite.
    pub fn write<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&WriteTx<'_>) -> Result<T, E>,
        E: From<StoreError>,
    {
        if self.in_write_scope() {
            return Err(StoreError::NestedWriteScope.into());
        }

        let started_at = Instant::now();
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)
            .map_err(StoreError::from)?;
        let scope_no = self.write_scopes.get() + 1;
        self.write_scopes.set(scope_no);
        let scope = WriteTx { tx };

        match f(&scope) {
            Ok(value) => {
                scope.tx.commit().map_err(StoreError::from)?;
                debug!(
                    "event=write_scope module=store status=ok scope={} duration_ms={}",
                    scope_no,
                    started_at.elapsed().as_millis()
                );
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = scope.tx.rollback() {
                    warn!(
                        "event=write_scope module=store status=error scope={} error_code=rollback_failed error={}",
                        scope_no, rollback_err
                    );
                } else {
                    debug!(
                        "event=write_scope module=store status=rolled_back scope={} duration_ms={}",
                        scope_no,
                        started_at.elapsed().as_millis()
                    );
                }
                Err(err)
            }
        }
    }
}

/// Capability token for one open write-scope.
///
/// Participant repository calls take `&WriteTx` and never open their own
/// scope, so a call tree rooted at one public operation writes through
/// exactly one transaction.
pub struct WriteTx<'conn> {
    tx: Transaction<'conn>,
}

impl WriteTx<'_> {
    /// Read/write access to one collection inside this scope.
    pub fn collection(&self, kind: CollectionKind) -> CollectionMut<'_> {
        CollectionMut::new(Collection::new(&self.tx, kind))
    }

    /// Typed read/write access to the collection of `R`.
    pub fn records<R: Record>(&self) -> RecordsMut<'_, R> {
        RecordsMut::new(Records::new(Collection::new(&self.tx, R::COLLECTION)))
    }

    /// Connection of this scope, for link queries that must see its writes.
    pub fn connection(&self) -> &Connection {
        &self.tx
    }
}
