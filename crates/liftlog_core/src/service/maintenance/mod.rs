//! Cross-aggregate maintenance engine.
//!
//! # Responsibility
//! - Bulk-delete data by category in fixed-size chunks with progress
//!   snapshots and cooperative cancellation.
//! - Run non-destructive optimization and integrity validation.
//!
//! # Invariants
//! - Each chunk commits in its own write-scope; committed chunks stay
//!   committed when a later chunk or category fails.
//! - A category failure is recorded in the outcome and never aborts the
//!   remaining categories. Only precondition failures return `Err`.
//! - Progress totals never decrease.

use crate::model::ids::ProfileId;
use crate::repo::workout_log_repo::{started_before, unfinished_started_before};
use crate::repo::{AggregateRepository, RepoError, RepoResult, Repositories};
use crate::store::links::{EXERCISE_SETS, GROUP_EXERCISES, WORKOUT_GROUPS};
use crate::store::{ensure_schema_ready, CollectionKind, FlatStore, RowFilter, StoreError, WriteTx};
use log::{debug, error, info, warn};
use serde::Serialize;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

mod category;
mod config;
mod integrity;
mod optimize;
mod progress;

pub use category::{MaintenanceCategory, UnknownCategory};
pub use config::{
    MaintenanceConfig, DEFAULT_CHUNK_SIZE, DEFAULT_OLD_LOG_RETENTION_DAYS,
    DEFAULT_SESSION_EXPIRY_HOURS,
};
pub use integrity::{IntegrityIssue, IntegrityReport};
pub use optimize::OptimizationReport;
pub use progress::{
    chunk_count, estimate_remaining, fraction, CancellationToken, CategoryCount,
    MaintenancePhase, MaintenanceProgress,
};

use progress::ProgressTracker;

/// Precondition failures that keep an operation from starting.
#[derive(Debug)]
pub enum MaintenanceError {
    InvalidConfig(String),
    /// Store schema is not at the expected version or lacks a collection.
    SchemaNotReady(StoreError),
    /// A write-scope is already open on the store.
    WriteScopeOpen,
    Store(StoreError),
}

impl Display for MaintenanceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidConfig(message) => write!(f, "invalid maintenance config: {message}"),
            Self::SchemaNotReady(err) => write!(f, "store not ready for maintenance: {err}"),
            Self::WriteScopeOpen => {
                write!(f, "maintenance cannot start inside an open write-scope")
            }
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for MaintenanceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::SchemaNotReady(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::InvalidConfig(_) | Self::WriteScopeOpen => None,
        }
    }
}

impl From<StoreError> for MaintenanceError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// One bulk delete invocation.
#[derive(Debug, Clone)]
pub struct BulkDeleteRequest {
    pub category: MaintenanceCategory,
    /// Restricts every category to one profile when set.
    pub profile_id: Option<ProfileId>,
    /// "Now" for retention cutoffs, epoch ms. Defaults to the system clock.
    pub reference_time_ms: Option<i64>,
    pub cancellation: Option<CancellationToken>,
}

impl BulkDeleteRequest {
    pub fn new(category: MaintenanceCategory) -> Self {
        Self {
            category,
            profile_id: None,
            reference_time_ms: None,
            cancellation: None,
        }
    }

    pub fn for_profile(mut self, profile_id: ProfileId) -> Self {
        self.profile_id = Some(profile_id);
        self
    }

    pub fn at(mut self, reference_time_ms: i64) -> Self {
        self.reference_time_ms = Some(reference_time_ms);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }
}

/// A category that failed part-way. Not an error: the outcome carries it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MaintenanceIssue {
    pub category: MaintenanceCategory,
    pub message: String,
    /// Items of the category left untouched because of the failure.
    pub items_skipped: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkDeleteOutcome {
    /// Rows removed by committed chunks; cascaded descendants are not counted.
    pub total_deleted: usize,
    pub deleted_by_category: BTreeMap<MaintenanceCategory, usize>,
    pub errors: Vec<MaintenanceIssue>,
    pub cancelled: bool,
    pub duration_ms: u64,
    pub final_progress: MaintenanceProgress,
}

/// A row selected for deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Candidate {
    kind: CollectionKind,
    id: String,
}

/// Candidates of one category, or the reason they could not be collected.
struct CategoryPlan {
    category: MaintenanceCategory,
    candidates: Result<Vec<Candidate>, String>,
}

pub struct MaintenanceEngine<'db> {
    repos: Repositories<'db>,
    config: MaintenanceConfig,
}

impl<'db> MaintenanceEngine<'db> {
    pub fn new(store: &'db FlatStore, config: MaintenanceConfig) -> Result<Self, MaintenanceError> {
        config.validate()?;
        Ok(Self {
            repos: Repositories::new(store),
            config,
        })
    }

    pub fn config(&self) -> &MaintenanceConfig {
        &self.config
    }

    fn store(&self) -> &'db FlatStore {
        self.repos.store()
    }

    fn ensure_ready(&self) -> Result<(), MaintenanceError> {
        self.config.validate()?;
        if self.store().in_write_scope() {
            return Err(MaintenanceError::WriteScopeOpen);
        }
        ensure_schema_ready(self.store().connection()).map_err(|err| match err {
            StoreError::SchemaNotReady { .. } | StoreError::MissingCollection(_) => {
                MaintenanceError::SchemaNotReady(err)
            }
            other => MaintenanceError::Store(other),
        })
    }

    /// Deletes everything in `request.category`, one write-scope per chunk.
    ///
    /// `on_progress` fires after every processed chunk.
    ///
    /// # Errors
    /// Only precondition failures; category failures land in
    /// [`BulkDeleteOutcome::errors`].
    pub fn bulk_delete(
        &self,
        request: &BulkDeleteRequest,
        mut on_progress: Option<&mut dyn FnMut(&MaintenanceProgress)>,
    ) -> Result<BulkDeleteOutcome, MaintenanceError> {
        let started_at = Instant::now();
        if let Err(err) = self.ensure_ready() {
            error!(
                "event=bulk_delete module=maintenance status=error category={} error={}",
                request.category, err
            );
            return Err(err);
        }
        let now_ms = request.reference_time_ms.unwrap_or_else(now_epoch_ms);
        info!(
            "event=bulk_delete module=maintenance status=start category={} profile_scoped={} chunk_size={}",
            request.category,
            request.profile_id.is_some(),
            self.config.chunk_size
        );

        let plans: Vec<CategoryPlan> = request
            .category
            .expand()
            .into_iter()
            .map(|category| CategoryPlan {
                category,
                candidates: self
                    .collect_candidates(category, request.profile_id, now_ms)
                    .map_err(|err| err.to_string()),
            })
            .collect();

        let mut tracker = ProgressTracker::new(
            plans
                .iter()
                .map(|plan| CategoryCount {
                    category: plan.category,
                    total: plan.candidates.as_ref().map_or(0, Vec::len),
                    processed: 0,
                    skipped: 0,
                })
                .collect(),
        );
        debug!(
            "event=bulk_delete module=maintenance status=counted categories={} total_items={}",
            plans.len(),
            plans
                .iter()
                .map(|plan| plan.candidates.as_ref().map_or(0, Vec::len))
                .sum::<usize>()
        );

        let mut deleted_by_category = BTreeMap::new();
        let mut errors = Vec::new();
        let mut cancelled = false;

        'categories: for (index, plan) in plans.iter().enumerate() {
            let candidates = match &plan.candidates {
                Ok(candidates) => candidates,
                Err(message) => {
                    warn!(
                        "event=bulk_delete_category module=maintenance status=error category={} phase=counting error={}",
                        plan.category, message
                    );
                    errors.push(MaintenanceIssue {
                        category: plan.category,
                        message: message.clone(),
                        items_skipped: 0,
                    });
                    continue;
                }
            };

            let mut deleted = 0usize;
            for (chunk_index, chunk) in candidates.chunks(self.config.chunk_size).enumerate() {
                if request.is_cancelled() {
                    cancelled = true;
                    deleted_by_category.insert(plan.category, deleted);
                    break 'categories;
                }

                match self.delete_chunk(chunk) {
                    Ok(removed) => {
                        deleted += removed;
                        tracker.record(index, chunk.len(), 0);
                        emit(&mut on_progress, &tracker, index);
                        std::thread::yield_now();
                    }
                    Err(err) => {
                        let skipped = candidates.len() - chunk_index * self.config.chunk_size;
                        warn!(
                            "event=bulk_delete_category module=maintenance status=error category={} chunk={} items_skipped={} error={}",
                            plan.category, chunk_index, skipped, err
                        );
                        tracker.record(index, 0, skipped);
                        errors.push(MaintenanceIssue {
                            category: plan.category,
                            message: err.to_string(),
                            items_skipped: skipped,
                        });
                        emit(&mut on_progress, &tracker, index);
                        break;
                    }
                }
            }

            debug!(
                "event=bulk_delete_category module=maintenance status=done category={} deleted={}",
                plan.category, deleted
            );
            deleted_by_category.insert(plan.category, deleted);
        }

        let phase = if cancelled {
            MaintenancePhase::Cancelled
        } else {
            MaintenancePhase::Completed
        };
        let total_deleted = deleted_by_category.values().sum();
        let duration_ms = started_at.elapsed().as_millis() as u64;
        info!(
            "event=bulk_delete module=maintenance status={} category={} total_deleted={} errors={} duration_ms={}",
            if cancelled { "cancelled" } else { "ok" },
            request.category,
            total_deleted,
            errors.len(),
            duration_ms
        );

        Ok(BulkDeleteOutcome {
            total_deleted,
            deleted_by_category,
            errors,
            cancelled,
            duration_ms,
            final_progress: tracker.snapshot(phase, None),
        })
    }

    /// Refreshes planner statistics and compacts the database file.
    pub fn optimize(&self) -> Result<OptimizationReport, MaintenanceError> {
        self.ensure_ready()?;
        match optimize::run(self.store()) {
            Ok(report) => {
                info!(
                    "event=db_optimize module=maintenance status=ok pages_before={} pages_after={} duration_ms={}",
                    report.page_count_before, report.page_count_after, report.duration_ms
                );
                Ok(report)
            }
            Err(err) => {
                error!(
                    "event=db_optimize module=maintenance status=error error={}",
                    err
                );
                Err(err.into())
            }
        }
    }

    /// Checks the file and the workout link structure without changing data.
    pub fn validate_integrity(&self) -> Result<IntegrityReport, MaintenanceError> {
        self.ensure_ready()?;
        match integrity::check(self.store()) {
            Ok(report) => {
                let status = if report.is_clean() { "ok" } else { "issues" };
                info!(
                    "event=integrity_check module=maintenance status={} rows_checked={} issues={} duration_ms={}",
                    status,
                    report.rows_checked,
                    report.issues.len(),
                    report.duration_ms
                );
                Ok(report)
            }
            Err(err) => {
                error!(
                    "event=integrity_check module=maintenance status=error error={}",
                    err
                );
                Err(err.into())
            }
        }
    }

    fn collect_candidates(
        &self,
        category: MaintenanceCategory,
        profile_id: Option<ProfileId>,
        now_ms: i64,
    ) -> RepoResult<Vec<Candidate>> {
        let store = self.store();
        let scoped = |kind: CollectionKind, filter: RowFilter| -> RepoResult<Vec<Candidate>> {
            Ok(store
                .collection(kind)
                .query(filter.profile(profile_id))
                .fetch_ids()?
                .into_iter()
                .map(|id| Candidate { kind, id })
                .collect())
        };

        match category {
            MaintenanceCategory::All => {
                let mut all = Vec::new();
                for category in MaintenanceCategory::ALL_ORDER {
                    all.extend(self.collect_candidates(category, profile_id, now_ms)?);
                }
                Ok(all)
            }
            MaintenanceCategory::Profiles => scoped(CollectionKind::Profiles, RowFilter::all()),
            MaintenanceCategory::Exercises => scoped(CollectionKind::Exercises, RowFilter::all()),
            MaintenanceCategory::TrainingPlans => {
                scoped(CollectionKind::TrainingPlans, RowFilter::all())
            }
            MaintenanceCategory::WorkoutLogs => {
                scoped(CollectionKind::WorkoutLogs, RowFilter::all())
            }
            MaintenanceCategory::MaxLogs => scoped(CollectionKind::MaxLogs, RowFilter::all()),
            MaintenanceCategory::BodyMetrics => {
                let mut candidates = scoped(CollectionKind::BodyWeights, RowFilter::all())?;
                candidates.extend(scoped(CollectionKind::BodyMeasurements, RowFilter::all())?);
                Ok(candidates)
            }
            MaintenanceCategory::OrphanedData => {
                let conn = store.connection();
                let mut candidates = Vec::new();
                // Parents first: deleting an orphaned group cascades to its
                // exercise logs and sets.
                for link in [WORKOUT_GROUPS, GROUP_EXERCISES, EXERCISE_SETS] {
                    candidates.extend(
                        link.unreferenced_child_ids(conn, profile_id)?
                            .into_iter()
                            .map(|id| Candidate {
                                kind: link.child,
                                id,
                            }),
                    );
                }
                Ok(candidates)
            }
            MaintenanceCategory::OldWorkoutLogs => scoped(
                CollectionKind::WorkoutLogs,
                started_before(self.config.old_log_cutoff(now_ms)),
            ),
            MaintenanceCategory::ExpiredSessions => scoped(
                CollectionKind::WorkoutLogs,
                unfinished_started_before(self.config.session_cutoff(now_ms)),
            ),
        }
    }

    /// Deletes one chunk inside a single write-scope. Returns rows removed.
    fn delete_chunk(&self, chunk: &[Candidate]) -> RepoResult<usize> {
        self.store().write(|tx| {
            let mut removed = 0usize;
            for candidate in chunk {
                if self.delete_candidate(tx, candidate)? {
                    removed += 1;
                }
            }
            Ok(removed)
        })
    }

    fn delete_candidate(&self, tx: &WriteTx<'_>, candidate: &Candidate) -> RepoResult<bool> {
        match candidate.kind {
            CollectionKind::WorkoutLogs => {
                self.repos.workouts().delete_in(tx, parse_id(candidate)?)
            }
            CollectionKind::GroupLogs => self.repos.groups().delete_in(tx, parse_id(candidate)?),
            CollectionKind::ExerciseLogs => {
                self.repos.exercise_logs().delete_in(tx, parse_id(candidate)?)
            }
            CollectionKind::PerformedSets => self.repos.sets().delete_in(tx, parse_id(candidate)?),
            kind => self.repos.documents(kind)?.delete_in(tx, parse_id(candidate)?),
        }
    }
}

fn parse_id<T: FromStr<Err = uuid::Error>>(candidate: &Candidate) -> RepoResult<T> {
    candidate.id.parse().map_err(|err| {
        RepoError::InvalidData(format!("{} id `{}`: {err}", candidate.kind, candidate.id))
    })
}

fn emit(
    on_progress: &mut Option<&mut dyn FnMut(&MaintenanceProgress)>,
    tracker: &ProgressTracker,
    index: usize,
) {
    if let Some(callback) = on_progress.as_deref_mut() {
        callback(&tracker.snapshot(MaintenancePhase::Deleting, Some(index)));
    }
}

fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}
