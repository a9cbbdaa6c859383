//! Subcommand implementations.

use clap::Args;
use liftlog_core::{
    BulkDeleteRequest, FlatStore, MaintenanceCategory, MaintenanceConfig, MaintenanceEngine,
    MaintenanceProgress, ProfileId,
};
use serde::Serialize;
use std::path::Path;

type CommandResult = Result<Status, Box<dyn std::error::Error>>;

/// How a successful command finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Clean,
    /// The command ran but found or left problems (exit code 2).
    IssuesFound,
}

#[derive(Debug, Args)]
pub struct BulkDeleteArgs {
    /// all, profiles, exercises, training_plans, workout_logs, max_logs,
    /// body_metrics, orphaned_data, old_workout_logs, expired_sessions
    #[arg(long)]
    pub category: MaintenanceCategory,

    /// Restrict deletion to one profile
    #[arg(long)]
    pub profile: Option<ProfileId>,

    #[arg(long)]
    pub chunk_size: Option<usize>,

    #[arg(long)]
    pub retention_days: Option<u32>,

    #[arg(long)]
    pub session_expiry_hours: Option<u32>,

    /// Print a progress line to stderr after each chunk
    #[arg(long)]
    pub progress: bool,
}

impl BulkDeleteArgs {
    fn config(&self) -> MaintenanceConfig {
        let defaults = MaintenanceConfig::default();
        MaintenanceConfig {
            chunk_size: self.chunk_size.unwrap_or(defaults.chunk_size),
            old_log_retention_days: self
                .retention_days
                .unwrap_or(defaults.old_log_retention_days),
            session_expiry_hours: self
                .session_expiry_hours
                .unwrap_or(defaults.session_expiry_hours),
        }
    }
}

pub fn bulk_delete(db: &Path, args: BulkDeleteArgs) -> CommandResult {
    let store = FlatStore::open(db)?;
    let engine = MaintenanceEngine::new(&store, args.config())?;

    let mut request = BulkDeleteRequest::new(args.category);
    if let Some(profile_id) = args.profile {
        request = request.for_profile(profile_id);
    }

    let mut report_progress = |progress: &MaintenanceProgress| {
        eprintln!(
            "{} {}/{} ({:.0}%)",
            progress
                .current_category
                .map_or("-", MaintenanceCategory::as_str),
            progress.items_processed + progress.items_skipped,
            progress.total_items,
            progress.overall_progress * 100.0
        );
    };
    let on_progress: Option<&mut dyn FnMut(&MaintenanceProgress)> = if args.progress {
        Some(&mut report_progress)
    } else {
        None
    };

    let outcome = engine.bulk_delete(&request, on_progress)?;
    print_json(&outcome)?;
    Ok(if outcome.errors.is_empty() {
        Status::Clean
    } else {
        Status::IssuesFound
    })
}

pub fn integrity(db: &Path) -> CommandResult {
    let store = FlatStore::open(db)?;
    let engine = MaintenanceEngine::new(&store, MaintenanceConfig::default())?;
    let report = engine.validate_integrity()?;
    print_json(&report)?;
    Ok(if report.is_clean() {
        Status::Clean
    } else {
        Status::IssuesFound
    })
}

pub fn optimize(db: &Path) -> CommandResult {
    let store = FlatStore::open(db)?;
    let engine = MaintenanceEngine::new(&store, MaintenanceConfig::default())?;
    print_json(&engine.optimize()?)?;
    Ok(Status::Clean)
}

fn print_json(value: &impl Serialize) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
