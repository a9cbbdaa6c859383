//! liftlog CLI
//!
//! Runs maintenance operations against a liftlog database file and prints
//! JSON reports.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

mod commands;

#[derive(Debug, Parser)]
#[command(name = "liftlog")]
#[command(about = "liftlog - workout log storage maintenance", long_about = None)]
struct Cli {
    /// Database file
    #[arg(long, global = true, default_value = "liftlog.db")]
    db: PathBuf,

    /// trace|debug|info|warn|error
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Absolute directory for rolling log files; logging is off without it
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the core version
    Version,
    /// Delete data by category in chunks
    BulkDelete(commands::BulkDeleteArgs),
    /// Validate file and link integrity
    Integrity,
    /// Refresh planner statistics and compact the file
    Optimize,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(log_dir) = &cli.log_dir {
        let level = cli
            .log_level
            .as_deref()
            .unwrap_or_else(|| liftlog_core::default_log_level());
        if let Err(e) = liftlog_core::init_logging(level, log_dir) {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    }

    let result = match cli.command {
        Commands::Version => {
            println!("{}", liftlog_core::core_version());
            Ok(commands::Status::Clean)
        }
        Commands::BulkDelete(args) => commands::bulk_delete(&cli.db, args),
        Commands::Integrity => commands::integrity(&cli.db),
        Commands::Optimize => commands::optimize(&cli.db),
    };

    match result {
        Ok(commands::Status::Clean) => ExitCode::SUCCESS,
        Ok(commands::Status::IssuesFound) => ExitCode::from(2),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Cli, Commands};
    use clap::{CommandFactory, Parser};
    use liftlog_core::MaintenanceCategory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn bulk_delete_parses_category_and_chunk_size() {
        let cli = Cli::try_parse_from([
            "liftlog",
            "--db",
            "custom.db",
            "bulk-delete",
            "--category",
            "old-workout-logs",
            "--chunk-size",
            "10",
        ])
        .unwrap();

        assert_eq!(cli.db.to_str(), Some("custom.db"));
        match cli.command {
            Commands::BulkDelete(args) => {
                assert_eq!(args.category, MaintenanceCategory::OldWorkoutLogs);
                assert_eq!(args.chunk_size, Some(10));
                assert!(!args.progress);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn unknown_category_is_rejected() {
        assert!(Cli::try_parse_from(["liftlog", "bulk-delete", "--category", "sessions"]).is_err());
    }
}
