//! Student lifecycle service.
//!
//! # Responsibility
//! - Implement create/read/update/delete/list over a `StudentRepository`.
//! - Validate caller input before any store access.
//! - Map store outcomes into one typed failure taxonomy.
//!
//! # Invariants
//! - Existence checks here are advisory; the store constraint is
//!   authoritative and its violations surface as the same error kinds.
//! - Update never changes `id`, `roll_number` or `created_at`.
//! - A failed operation leaves the store unchanged.
//! - The service holds no state besides its repository.

use crate::model::student::{
    RollNumber, Student, StudentId, StudentInput, StudentValidationError, StudentView,
};
use crate::repo::student_repo::{RepoError, StudentRepository, UniqueField};
use log::{info, warn};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Key used to address one student record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StudentKey {
    Id(StudentId),
    Email(String),
    RollNumber(RollNumber),
}

impl Display for StudentKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "id {id}"),
            Self::Email(email) => write!(f, "email {email}"),
            Self::RollNumber(roll_number) => write!(f, "roll number {roll_number}"),
        }
    }
}

/// Failure kinds returned by lifecycle operations.
#[derive(Debug)]
pub enum StudentError {
    /// Lookup, update or delete target is absent.
    NotFound(StudentKey),
    /// Another record already owns this email.
    DuplicateEmail(String),
    /// Another record already owns this roll number.
    DuplicateRollNumber(Option<RollNumber>),
    /// Input failed field validation; no store call was made.
    ValidationFailed(StudentValidationError),
    /// Store failure with no caller-recoverable meaning.
    Unexpected(RepoError),
}

impl StudentError {
    /// Boundary status code for this failure kind.
    pub fn status(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::DuplicateEmail(_) | Self::DuplicateRollNumber(_) => 409,
            Self::ValidationFailed(_) => 400,
            Self::Unexpected(_) => 500,
        }
    }

    /// Short machine-readable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "STUDENT_NOT_FOUND",
            Self::DuplicateEmail(_) => "EMAIL_ALREADY_EXISTS",
            Self::DuplicateRollNumber(_) => "ROLL_NUMBER_ALREADY_EXISTS",
            Self::ValidationFailed(_) => "VALIDATION_FAILED",
            Self::Unexpected(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    /// Per-field messages, present only for validation failures.
    pub fn field_errors(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            Self::ValidationFailed(err) => Some(&err.field_errors),
            _ => None,
        }
    }

    fn from_write(err: RepoError, email: &str) -> Self {
        match err {
            RepoError::UniqueViolation(UniqueField::Email) => {
                Self::DuplicateEmail(email.to_string())
            }
            // Roll numbers are store-assigned, so the colliding value is unknown here.
            RepoError::UniqueViolation(UniqueField::RollNumber) => Self::DuplicateRollNumber(None),
            RepoError::NotFound(id) => Self::NotFound(StudentKey::Id(id)),
            other => Self::Unexpected(other),
        }
    }
}

impl Display for StudentError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(key) => write!(f, "Student with {key} not found"),
            Self::DuplicateEmail(email) => write!(f, "Email {email} already exists"),
            Self::DuplicateRollNumber(Some(roll_number)) => {
                write!(f, "Roll number {roll_number} already exists")
            }
            Self::DuplicateRollNumber(None) => write!(f, "Roll number already exists"),
            Self::ValidationFailed(_) => write!(f, "Invalid input data"),
            Self::Unexpected(_) => write!(f, "An unexpected error occurred"),
        }
    }
}

impl Error for StudentError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ValidationFailed(err) => Some(err),
            Self::Unexpected(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for StudentError {
    fn from(value: RepoError) -> Self {
        Self::Unexpected(value)
    }
}

impl From<StudentValidationError> for StudentError {
    fn from(value: StudentValidationError) -> Self {
        Self::ValidationFailed(value)
    }
}

pub type StudentResult<T> = Result<T, StudentError>;

/// Lifecycle manager for student records.
pub struct StudentService<R: StudentRepository> {
    repo: R,
}

impl<R: StudentRepository> StudentService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates one student; the store assigns id, roll number and timestamps.
    pub fn create(&self, input: StudentInput) -> StudentResult<StudentView> {
        let started_at = Instant::now();
        input.validate()?;

        if self.repo.exists_by_email(&input.email)? {
            warn!("event=student_create module=service status=rejected reason=duplicate_email");
            return Err(StudentError::DuplicateEmail(input.email));
        }

        let email = input.email.clone();
        let student = match self.repo.insert_student(&input.into_new_student()) {
            Ok(student) => student,
            Err(err) => {
                let err = StudentError::from_write(err, &email);
                warn!(
                    "event=student_create module=service status=rejected error_code={}",
                    err.error_code()
                );
                return Err(err);
            }
        };

        info!(
            "event=student_create module=service status=ok student_id={} roll_number={} duration_ms={}",
            student.id,
            student.roll_number,
            started_at.elapsed().as_millis()
        );
        Ok(student.into())
    }

    /// Gets one student by stable id.
    pub fn get_by_id(&self, id: StudentId) -> StudentResult<StudentView> {
        self.found(self.repo.find_by_id(id)?, StudentKey::Id(id))
    }

    /// Gets one student by exact email match.
    pub fn get_by_email(&self, email: &str) -> StudentResult<StudentView> {
        self.found(
            self.repo.find_by_email(email)?,
            StudentKey::Email(email.to_string()),
        )
    }

    /// Gets one student by roll number.
    pub fn get_by_roll_number(&self, roll_number: RollNumber) -> StudentResult<StudentView> {
        self.found(
            self.repo.find_by_roll_number(roll_number)?,
            StudentKey::RollNumber(roll_number),
        )
    }

    /// Lists every stored student. Callers must not rely on ordering.
    pub fn list_all(&self) -> StudentResult<Vec<StudentView>> {
        let students = self.repo.find_all()?;
        info!(
            "event=student_list module=service status=ok count={}",
            students.len()
        );
        Ok(students.into_iter().map(StudentView::from).collect())
    }

    /// Replaces the mutable fields of one student.
    ///
    /// The uniqueness check runs only when the email actually changes, so a
    /// record never collides with itself.
    pub fn update(&self, id: StudentId, input: StudentInput) -> StudentResult<StudentView> {
        let started_at = Instant::now();
        input.validate()?;

        let existing = self
            .repo
            .find_by_id(id)?
            .ok_or(StudentError::NotFound(StudentKey::Id(id)))?;

        let (next, branch) = if existing.email == input.email {
            (apply_same_email_update(&existing, &input), "same_email")
        } else {
            if self.repo.exists_by_email(&input.email)? {
                warn!(
                    "event=student_update module=service status=rejected student_id={id} reason=duplicate_email"
                );
                return Err(StudentError::DuplicateEmail(input.email));
            }
            (apply_changed_email_update(&existing, &input), "changed_email")
        };

        let student = self
            .repo
            .update_student(&next)
            .map_err(|err| StudentError::from_write(err, &input.email))?;

        info!(
            "event=student_update module=service status=ok student_id={} branch={} duration_ms={}",
            student.id,
            branch,
            started_at.elapsed().as_millis()
        );
        Ok(student.into())
    }

    /// Permanently deletes one student by id.
    pub fn delete_by_id(&self, id: StudentId) -> StudentResult<()> {
        self.deleted(self.repo.delete_by_id(id)?, StudentKey::Id(id))
    }

    /// Permanently deletes one student by roll number.
    pub fn delete_by_roll_number(&self, roll_number: RollNumber) -> StudentResult<()> {
        self.deleted(
            self.repo.delete_by_roll_number(roll_number)?,
            StudentKey::RollNumber(roll_number),
        )
    }

    fn found(&self, student: Option<Student>, key: StudentKey) -> StudentResult<StudentView> {
        match student {
            Some(student) => {
                info!(
                    "event=student_lookup module=service status=ok student_id={}",
                    student.id
                );
                Ok(student.into())
            }
            None => {
                warn!("event=student_lookup module=service status=not_found key={}", key_kind(&key));
                Err(StudentError::NotFound(key))
            }
        }
    }

    fn deleted(&self, deleted: bool, key: StudentKey) -> StudentResult<()> {
        if !deleted {
            warn!("event=student_delete module=service status=not_found key={}", key_kind(&key));
            return Err(StudentError::NotFound(key));
        }
        match &key {
            StudentKey::Id(id) => info!("event=student_delete module=service status=ok student_id={id}"),
            StudentKey::RollNumber(roll_number) => {
                info!("event=student_delete module=service status=ok roll_number={roll_number}")
            }
            StudentKey::Email(_) => info!("event=student_delete module=service status=ok"),
        }
        Ok(())
    }
}

// Emails stay out of logs; only the key kind is recorded.
fn key_kind(key: &StudentKey) -> &'static str {
    match key {
        StudentKey::Id(_) => "id",
        StudentKey::Email(_) => "email",
        StudentKey::RollNumber(_) => "roll_number",
    }
}

/// Applies an update whose email matches the stored one.
///
/// Email is carried over from `existing`; the other three mutable fields
/// come from `input`.
pub fn apply_same_email_update(existing: &Student, input: &StudentInput) -> Student {
    Student {
        first_name: input.first_name.clone(),
        last_name: input.last_name.clone(),
        date_of_birth: input.date_of_birth,
        ..existing.clone()
    }
}

/// Applies an update that moves the record to a new email.
///
/// Uniqueness of `input.email` must already have been checked.
pub fn apply_changed_email_update(existing: &Student, input: &StudentInput) -> Student {
    Student {
        email: input.email.clone(),
        ..apply_same_email_update(existing, input)
    }
}
