//! Subcommand execution.

use crate::{Commands, API_BASE_PATH};
use chrono::NaiveDate;
use clap::Args;
use log::{info, warn};
use serde_json::Value;
use std::collections::BTreeMap;
use std::error::Error;
use std::path::Path;
use std::process::ExitCode;
use student_core::db::open_db;
use student_core::{
    check_health, ApiErrorResponse, HealthStatus, RollNumber, SqliteStudentRepository,
    StudentError, StudentInput, StudentResult, StudentService, StudentValidationError,
};
use uuid::Uuid;

type CommandResult = Result<ExitCode, Box<dyn Error>>;

const DATE_OF_BIRTH_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Args)]
pub struct StudentArgs {
    #[arg(long)]
    pub first_name: String,
    #[arg(long)]
    pub last_name: String,
    #[arg(long)]
    pub email: String,
    /// Date of birth as YYYY-MM-DD; malformed dates are reported as a
    /// `dateOfBirth` field error
    #[arg(long)]
    pub date_of_birth: String,
}

impl StudentArgs {
    /// Builds lifecycle input, reporting an unparseable date of birth
    /// together with any other field errors.
    pub fn into_input(self) -> StudentResult<StudentInput> {
        match NaiveDate::parse_from_str(self.date_of_birth.trim(), DATE_OF_BIRTH_FORMAT) {
            Ok(date_of_birth) => Ok(StudentInput::new(
                self.first_name,
                self.last_name,
                self.email,
                date_of_birth,
            )),
            Err(_) => {
                let input =
                    StudentInput::new(self.first_name, self.last_name, self.email, NaiveDate::MIN);
                let mut field_errors = match input.validate() {
                    Ok(()) => BTreeMap::new(),
                    Err(err) => err.field_errors,
                };
                field_errors.insert(
                    "dateOfBirth".to_string(),
                    "Date of Birth must be a valid date (YYYY-MM-DD)".to_string(),
                );
                Err(StudentError::ValidationFailed(StudentValidationError {
                    field_errors,
                }))
            }
        }
    }
}

#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
pub struct LookupArgs {
    #[arg(long)]
    pub id: Option<Uuid>,
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long)]
    pub roll_number: Option<RollNumber>,
}

#[derive(Debug, Args)]
pub struct UpdateArgs {
    /// Student id
    pub id: Uuid,
    #[command(flatten)]
    pub fields: StudentArgs,
}

#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
pub struct DeleteArgs {
    #[arg(long)]
    pub id: Option<Uuid>,
    #[arg(long)]
    pub roll_number: Option<RollNumber>,
}

/// Runs one subcommand against the database at `db_path`.
pub fn execute(db_path: &Path, command: Commands) -> CommandResult {
    match command {
        Commands::Version => {
            println!("student_core version={}", student_core::core_version());
            Ok(ExitCode::SUCCESS)
        }
        Commands::Health => {
            let conn = open_db(db_path)?;
            let report = check_health(&conn);
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(match report.status {
                HealthStatus::Up => ExitCode::SUCCESS,
                HealthStatus::Down => ExitCode::FAILURE,
            })
        }
        Commands::Create(args) => with_service(db_path, |service| {
            report(
                API_BASE_PATH.to_string(),
                args.into_input().and_then(|input| service.create(input)),
            )
        }),
        Commands::Get(args) => with_service(db_path, |service| {
            if let Some(id) = args.id {
                report(format!("{API_BASE_PATH}/{id}"), service.get_by_id(id))
            } else if let Some(email) = args.email {
                report(
                    format!("{API_BASE_PATH}/email/{email}"),
                    service.get_by_email(&email),
                )
            } else if let Some(roll_number) = args.roll_number {
                report(
                    format!("{API_BASE_PATH}/rollnumber/{roll_number}"),
                    service.get_by_roll_number(roll_number),
                )
            } else {
                Err("one of --id, --email or --roll-number is required".into())
            }
        }),
        Commands::List => with_service(db_path, |service| {
            report(API_BASE_PATH.to_string(), service.list_all())
        }),
        Commands::Update(args) => with_service(db_path, |service| {
            report(
                format!("{API_BASE_PATH}/{}", args.id),
                args
                    .fields
                    .into_input()
                    .and_then(|input| service.update(args.id, input)),
            )
        }),
        Commands::Delete(args) => with_service(db_path, |service| {
            if let Some(id) = args.id {
                report(format!("{API_BASE_PATH}/{id}"), service.delete_by_id(id))
            } else if let Some(roll_number) = args.roll_number {
                report(
                    format!("{API_BASE_PATH}/rollnumber/{roll_number}"),
                    service.delete_by_roll_number(roll_number),
                )
            } else {
                Err("one of --id or --roll-number is required".into())
            }
        }),
    }
}

fn with_service<F>(db_path: &Path, run: F) -> CommandResult
where
    F: FnOnce(&StudentService<SqliteStudentRepository<'_>>) -> CommandResult,
{
    let conn = open_db(db_path)?;
    let service = StudentService::new(SqliteStudentRepository::try_new(&conn)?);
    run(&service)
}

/// Prints a successful result as JSON, or the error payload for `path`.
///
/// Unit results (deletes) print nothing on success.
fn report<T: serde::Serialize>(path: String, result: StudentResult<T>) -> CommandResult {
    match result {
        Ok(value) => {
            let json = serde_json::to_value(&value)?;
            if json != Value::Null {
                println!("{}", serde_json::to_string_pretty(&json)?);
            }
            info!("event=cli_command module=cli status=ok");
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            warn!(
                "event=cli_command module=cli status=error code={} http_status={}",
                err.error_code(),
                err.status()
            );
            let payload = ApiErrorResponse::from_error(&err, path);
            eprintln!("{}", serde_json::to_string_pretty(&payload)?);
            Ok(ExitCode::FAILURE)
        }
    }
}
