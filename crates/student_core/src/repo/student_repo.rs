//! Student repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide keyed CRUD APIs over the `students` table.
//! - Own id generation, roll-number assignment and timestamps.
//! - Classify SQLite uniqueness failures into semantic errors.
//!
//! # Invariants
//! - `email` and `roll_number` uniqueness is enforced by SQL constraints,
//!   independent of any caller-side pre-check.
//! - Roll numbers come from the table's `AUTOINCREMENT` sequence and are
//!   never bound by application code.
//! - Update statements never write `student_id`, `roll_number` or
//!   `created_at`.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::student::{NewStudent, RollNumber, Student, StudentId};
use chrono::{DateTime, Utc};
use rusqlite::{ffi, params, Connection, ErrorCode, Params, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const STUDENT_COLUMNS: &str = "student_id,
    roll_number,
    first_name,
    last_name,
    email,
    date_of_birth,
    created_at,
    updated_at";

const STUDENT_COLUMN_NAMES: [&str; 8] = [
    "student_id",
    "roll_number",
    "first_name",
    "last_name",
    "email",
    "date_of_birth",
    "created_at",
    "updated_at",
];

// Epoch milliseconds evaluated once per statement by SQLite.
const NOW_MS_SQL: &str = "CAST((julianday('now') - 2440587.5) * 86400000 AS INTEGER)";

pub type RepoResult<T> = Result<T, RepoError>;

/// Column guarded by a uniqueness constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Email,
    RollNumber,
}

impl UniqueField {
    fn column(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::RollNumber => "roll_number",
        }
    }
}

/// Repository error for student persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Update target vanished before the write landed.
    NotFound(StudentId),
    /// A write was rejected by a uniqueness constraint.
    UniqueViolation(UniqueField),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Required column is missing from expected table.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// Persisted data cannot be converted to a valid record.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "student not found: {id}"),
            Self::UniqueViolation(field) => {
                write!(f, "unique constraint violated on students.{}", field.column())
            }
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "student repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "student repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "student repository requires column `{column}` in table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted student data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        match unique_violation(&value) {
            Some(field) => Self::UniqueViolation(field),
            None => Self::Db(DbError::Sqlite(value)),
        }
    }
}

/// Record store contract backing the student lifecycle.
///
/// Implementations must enforce email and roll-number uniqueness themselves
/// and report violations as `RepoError::UniqueViolation`.
pub trait StudentRepository {
    fn exists_by_email(&self, email: &str) -> RepoResult<bool>;
    fn exists_by_roll_number(&self, roll_number: RollNumber) -> RepoResult<bool>;
    fn find_by_id(&self, id: StudentId) -> RepoResult<Option<Student>>;
    fn find_by_email(&self, email: &str) -> RepoResult<Option<Student>>;
    fn find_by_roll_number(&self, roll_number: RollNumber) -> RepoResult<Option<Student>>;
    /// Inserts a record, assigning id, roll number and both timestamps.
    fn insert_student(&self, student: &NewStudent) -> RepoResult<Student>;
    /// Writes the mutable fields of an existing record and refreshes
    /// `updated_at`. Returns `NotFound` when the id no longer exists.
    fn update_student(&self, student: &Student) -> RepoResult<Student>;
    /// Returns whether a row was deleted.
    fn delete_by_id(&self, id: StudentId) -> RepoResult<bool>;
    /// Returns whether a row was deleted.
    fn delete_by_roll_number(&self, roll_number: RollNumber) -> RepoResult<bool>;
    fn find_all(&self) -> RepoResult<Vec<Student>>;
}

/// SQLite-backed student repository.
pub struct SqliteStudentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteStudentRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_student_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn query_optional<P: Params>(&self, sql: &str, params: P) -> RepoResult<Option<Student>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params)?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_student_row(row)?)),
            None => Ok(None),
        }
    }

    fn query_exists<P: Params>(&self, sql: &str, params: P) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(sql, params, |row| row.get(0))?;
        Ok(exists == 1)
    }
}

impl StudentRepository for SqliteStudentRepository<'_> {
    fn exists_by_email(&self, email: &str) -> RepoResult<bool> {
        self.query_exists(
            "SELECT EXISTS(SELECT 1 FROM students WHERE email = ?1);",
            [email],
        )
    }

    fn exists_by_roll_number(&self, roll_number: RollNumber) -> RepoResult<bool> {
        self.query_exists(
            "SELECT EXISTS(SELECT 1 FROM students WHERE roll_number = ?1);",
            [roll_number],
        )
    }

    fn find_by_id(&self, id: StudentId) -> RepoResult<Option<Student>> {
        self.query_optional(
            &format!("SELECT {STUDENT_COLUMNS} FROM students WHERE student_id = ?1;"),
            [id.to_string()],
        )
    }

    fn find_by_email(&self, email: &str) -> RepoResult<Option<Student>> {
        self.query_optional(
            &format!("SELECT {STUDENT_COLUMNS} FROM students WHERE email = ?1;"),
            [email],
        )
    }

    fn find_by_roll_number(&self, roll_number: RollNumber) -> RepoResult<Option<Student>> {
        self.query_optional(
            &format!("SELECT {STUDENT_COLUMNS} FROM students WHERE roll_number = ?1;"),
            [roll_number],
        )
    }

    fn insert_student(&self, student: &NewStudent) -> RepoResult<Student> {
        let id = Uuid::new_v4();
        let inserted = self.query_optional(
            &format!(
                "INSERT INTO students (
                    student_id,
                    first_name,
                    last_name,
                    email,
                    date_of_birth,
                    created_at,
                    updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, {NOW_MS_SQL}, {NOW_MS_SQL})
                RETURNING {STUDENT_COLUMNS};"
            ),
            params![
                id.to_string(),
                student.first_name.as_str(),
                student.last_name.as_str(),
                student.email.as_str(),
                student.date_of_birth,
            ],
        )?;

        inserted.ok_or_else(|| RepoError::InvalidData(format!("insert of {id} returned no row")))
    }

    fn update_student(&self, student: &Student) -> RepoResult<Student> {
        let updated = self.query_optional(
            &format!(
                "UPDATE students
                 SET
                    first_name = ?1,
                    last_name = ?2,
                    email = ?3,
                    date_of_birth = ?4,
                    updated_at = {NOW_MS_SQL}
                 WHERE student_id = ?5
                 RETURNING {STUDENT_COLUMNS};"
            ),
            params![
                student.first_name.as_str(),
                student.last_name.as_str(),
                student.email.as_str(),
                student.date_of_birth,
                student.id.to_string(),
            ],
        )?;

        updated.ok_or(RepoError::NotFound(student.id))
    }

    fn delete_by_id(&self, id: StudentId) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "DELETE FROM students WHERE student_id = ?1;",
            [id.to_string()],
        )?;
        Ok(changed > 0)
    }

    fn delete_by_roll_number(&self, roll_number: RollNumber) -> RepoResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM students WHERE roll_number = ?1;", [roll_number])?;
        Ok(changed > 0)
    }

    fn find_all(&self) -> RepoResult<Vec<Student>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {STUDENT_COLUMNS} FROM students ORDER BY roll_number ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut students = Vec::new();

        while let Some(row) = rows.next()? {
            students.push(parse_student_row(row)?);
        }

        Ok(students)
    }
}

fn unique_violation(err: &rusqlite::Error) -> Option<UniqueField> {
    let rusqlite::Error::SqliteFailure(failure, Some(message)) = err else {
        return None;
    };
    if failure.code != ErrorCode::ConstraintViolation {
        return None;
    }
    if failure.extended_code != ffi::SQLITE_CONSTRAINT_UNIQUE
        && failure.extended_code != ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    {
        return None;
    }

    if message.contains("students.email") {
        Some(UniqueField::Email)
    } else if message.contains("students.roll_number") {
        Some(UniqueField::RollNumber)
    } else {
        None
    }
}

fn parse_student_row(row: &Row<'_>) -> RepoResult<Student> {
    let id_text: String = row.get("student_id")?;
    let id = Uuid::parse_str(&id_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid `{id_text}` in students.student_id"))
    })?;

    Ok(Student {
        id,
        roll_number: row.get("roll_number")?,
        first_name: row.get("first_name")?,
        last_name: row.get("last_name")?,
        email: row.get("email")?,
        date_of_birth: row.get("date_of_birth")?,
        created_at: parse_epoch_ms(row.get("created_at")?, "created_at")?,
        updated_at: parse_epoch_ms(row.get("updated_at")?, "updated_at")?,
    })
}

fn parse_epoch_ms(value: i64, column: &'static str) -> RepoResult<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(value).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid timestamp `{value}` in students.{column}"))
    })
}

fn ensure_student_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, "students")? {
        return Err(RepoError::MissingRequiredTable("students"));
    }

    for column in STUDENT_COLUMN_NAMES {
        if !table_has_column(conn, "students", column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: "students",
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
