//! Progress snapshots, chunk arithmetic and cooperative cancellation.

use super::MaintenanceCategory;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MaintenancePhase {
    Deleting,
    Completed,
    Cancelled,
}

/// Per-category totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub category: MaintenanceCategory,
    pub total: usize,
    pub processed: usize,
    pub skipped: usize,
}

impl CategoryCount {
    fn done(&self) -> usize {
        self.processed + self.skipped
    }
}

/// Snapshot handed to the progress callback after each chunk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaintenanceProgress {
    pub phase: MaintenancePhase,
    pub current_category: Option<MaintenanceCategory>,
    pub category_counts: Vec<CategoryCount>,
    pub items_processed: usize,
    pub items_skipped: usize,
    pub total_items: usize,
    /// `0.0..=1.0` for the current category.
    pub category_progress: f64,
    /// `0.0..=1.0` over every category of the request.
    pub overall_progress: f64,
    pub estimated_remaining_ms: Option<u64>,
}

/// Number of chunks needed for `items` at `chunk_size`.
pub fn chunk_count(items: usize, chunk_size: usize) -> usize {
    if chunk_size == 0 {
        return 0;
    }
    items.div_ceil(chunk_size)
}

/// `done / total`, clamped to `0.0..=1.0`; an empty total counts as complete.
pub fn fraction(done: usize, total: usize) -> f64 {
    if total == 0 {
        return 1.0;
    }
    (done as f64 / total as f64).clamp(0.0, 1.0)
}

/// Linear extrapolation of the remaining time from throughput so far.
pub fn estimate_remaining(elapsed: Duration, done: usize, total: usize) -> Option<Duration> {
    if done == 0 {
        return None;
    }
    let remaining = total.saturating_sub(done);
    Some(elapsed.mul_f64(remaining as f64 / done as f64))
}

/// Running totals for one bulk delete.
pub(crate) struct ProgressTracker {
    started_at: Instant,
    counts: Vec<CategoryCount>,
}

impl ProgressTracker {
    pub(crate) fn new(counts: Vec<CategoryCount>) -> Self {
        Self {
            started_at: Instant::now(),
            counts,
        }
    }

    pub(crate) fn record(&mut self, index: usize, processed: usize, skipped: usize) {
        if let Some(count) = self.counts.get_mut(index) {
            count.processed += processed;
            count.skipped += skipped;
        }
    }

    pub(crate) fn snapshot(
        &self,
        phase: MaintenancePhase,
        index: Option<usize>,
    ) -> MaintenanceProgress {
        let total_items: usize = self.counts.iter().map(|count| count.total).sum();
        let items_processed: usize = self.counts.iter().map(|count| count.processed).sum();
        let items_skipped: usize = self.counts.iter().map(|count| count.skipped).sum();
        let current = index.and_then(|index| self.counts.get(index));
        let done = items_processed + items_skipped;

        MaintenanceProgress {
            phase,
            current_category: current.map(|count| count.category),
            category_counts: self.counts.clone(),
            items_processed,
            items_skipped,
            total_items,
            category_progress: current.map_or(0.0, |count| fraction(count.done(), count.total)),
            overall_progress: fraction(done, total_items),
            estimated_remaining_ms: estimate_remaining(self.started_at.elapsed(), done, total_items)
                .map(|remaining| remaining.as_millis() as u64),
        }
    }
}

/// Cooperative cancellation flag shared between the caller and a running
/// bulk delete. Checked before every chunk.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::{chunk_count, estimate_remaining, fraction, CancellationToken};
    use std::time::Duration;

    #[test]
    fn chunk_count_rounds_up() {
        assert_eq!(chunk_count(0, 50), 0);
        assert_eq!(chunk_count(25, 50), 1);
        assert_eq!(chunk_count(50, 50), 1);
        assert_eq!(chunk_count(51, 50), 2);
    }

    #[test]
    fn empty_total_is_complete() {
        assert_eq!(fraction(0, 0), 1.0);
        assert_eq!(fraction(1, 4), 0.25);
    }

    #[test]
    fn estimate_needs_progress() {
        assert_eq!(estimate_remaining(Duration::from_secs(1), 0, 10), None);
        assert_eq!(
            estimate_remaining(Duration::from_secs(2), 5, 10),
            Some(Duration::from_secs(2))
        );
    }

    #[test]
    fn cancellation_is_shared_between_clones() {
        let token = CancellationToken::new();
        let observer = token.clone();
        assert!(!observer.is_cancelled());
        token.cancel();
        assert!(observer.is_cancelled());
    }
}
