//! Student registry CLI.
//!
//! # Responsibility
//! - Drive every lifecycle operation against a SQLite database file.
//! - Print views as JSON on stdout and failures as error payloads on stderr.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

mod commands;

const API_BASE_PATH: &str = "/api/v1/students";

#[derive(Debug, Parser)]
#[command(name = "student_cli")]
#[command(about = "Student registry - manage student records", long_about = None)]
struct Cli {
    /// SQLite database file
    #[arg(
        long,
        global = true,
        env = "STUDENT_REGISTRY_DB",
        default_value = "student_registry.sqlite3"
    )]
    db: PathBuf,

    /// Log level (trace|debug|info|warn|error)
    #[arg(long, global = true, env = "STUDENT_REGISTRY_LOG_LEVEL")]
    log_level: Option<String>,

    /// Absolute directory for rolling log files; logging is off when unset
    #[arg(long, global = true, env = "STUDENT_REGISTRY_LOG_DIR")]
    log_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create a student
    Create(commands::StudentArgs),
    /// Get one student by id, email or roll number
    Get(commands::LookupArgs),
    /// List all students
    List,
    /// Replace the mutable fields of a student
    Update(commands::UpdateArgs),
    /// Delete a student by id or roll number
    Delete(commands::DeleteArgs),
    /// Report database health
    Health,
    /// Print core version
    Version,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(log_dir) = cli.log_dir.as_deref() {
        let level = cli
            .log_level
            .as_deref()
            .unwrap_or(student_core::default_log_level());
        if let Err(err) = student_core::init_logging(level, log_dir) {
            eprintln!("Error: {err}");
            return ExitCode::FAILURE;
        }
    }

    match commands::execute(&cli.db, cli.command) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}
