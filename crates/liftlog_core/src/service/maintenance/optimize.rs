//! Storage optimization: planner statistics refresh and file compaction.

use crate::store::{FlatStore, StoreResult};
use serde::Serialize;
use std::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptimizationReport {
    pub page_size: u64,
    pub page_count_before: u64,
    pub page_count_after: u64,
    pub freelist_count_before: u64,
    pub freelist_count_after: u64,
    pub duration_ms: u64,
}

impl OptimizationReport {
    /// Bytes released back to the filesystem.
    pub fn reclaimed_bytes(&self) -> u64 {
        self.page_count_before
            .saturating_sub(self.page_count_after)
            .saturating_mul(self.page_size)
    }
}

/// Runs `PRAGMA optimize` then `VACUUM`. Must not run inside a write-scope.
pub(crate) fn run(store: &FlatStore) -> StoreResult<OptimizationReport> {
    let started_at = Instant::now();
    let conn = store.connection();
    let page_size = pragma_u64(store, "page_size")?;
    let page_count_before = pragma_u64(store, "page_count")?;
    let freelist_count_before = pragma_u64(store, "freelist_count")?;

    conn.execute_batch("PRAGMA optimize;\nVACUUM;")?;

    Ok(OptimizationReport {
        page_size,
        page_count_before,
        page_count_after: pragma_u64(store, "page_count")?,
        freelist_count_before,
        freelist_count_after: pragma_u64(store, "freelist_count")?,
        duration_ms: started_at.elapsed().as_millis() as u64,
    })
}

fn pragma_u64(store: &FlatStore, name: &'static str) -> StoreResult<u64> {
    let value: i64 = store
        .connection()
        .query_row(&format!("PRAGMA {name};"), [], |row| row.get(0))?;
    Ok(value.max(0) as u64)
}
