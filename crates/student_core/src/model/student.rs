//! Student domain model.
//!
//! # Responsibility
//! - Define the stored student record and its caller-facing input/view shapes.
//! - Own field-level validation rules for caller-supplied input.
//!
//! # Invariants
//! - `id` and `roll_number` are assigned by the store and never change.
//! - `date_of_birth` is strictly before the validation date.
//! - Name and email length limits are counted in characters, not bytes.

use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of one student record.
pub type StudentId = Uuid;

/// Store-assigned sequential roll number.
pub type RollNumber = i64;

pub const MAX_NAME_CHARS: usize = 50;
pub const MAX_EMAIL_CHARS: usize = 255;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+)*@[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)*$",
    )
    .expect("valid email regex")
});

/// Canonical stored student record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub roll_number: RollNumber,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub date_of_birth: NaiveDate,
    /// Set once by the store on insert.
    pub created_at: DateTime<Utc>,
    /// Refreshed by the store on every successful write.
    pub updated_at: DateTime<Utc>,
}

/// Insert payload handed to the store.
///
/// Carries only caller-owned fields; id, roll number and timestamps are
/// assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStudent {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub date_of_birth: NaiveDate,
}

/// Caller-supplied student fields for create and update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentInput {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub date_of_birth: NaiveDate,
}

impl StudentInput {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
        date_of_birth: NaiveDate,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: email.into(),
            date_of_birth,
        }
    }

    /// Validates every field against the current UTC date.
    pub fn validate(&self) -> Result<(), StudentValidationError> {
        self.validate_at(Utc::now().date_naive())
    }

    /// Validates every field, treating `today` as the validation date.
    ///
    /// All failing fields are reported together; each field carries the
    /// message of its first failing rule.
    pub fn validate_at(&self, today: NaiveDate) -> Result<(), StudentValidationError> {
        let mut errors = BTreeMap::new();

        if let Some(message) = check_name(
            &self.first_name,
            "First Name is required",
            "First Name cannot be more than 50 characters",
        ) {
            errors.insert("firstName".to_string(), message.to_string());
        }
        if let Some(message) = check_name(
            &self.last_name,
            "Last Name is required",
            "Last Name cannot be more than 50 characters",
        ) {
            errors.insert("lastName".to_string(), message.to_string());
        }
        if let Some(message) = check_email(&self.email) {
            errors.insert("email".to_string(), message.to_string());
        }
        if self.date_of_birth >= today {
            errors.insert(
                "dateOfBirth".to_string(),
                "Date of Birth must be in the past".to_string(),
            );
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(StudentValidationError {
                field_errors: errors,
            })
        }
    }

    pub(crate) fn into_new_student(self) -> NewStudent {
        NewStudent {
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            date_of_birth: self.date_of_birth,
        }
    }
}

fn check_name(
    value: &str,
    blank_message: &'static str,
    too_long_message: &'static str,
) -> Option<&'static str> {
    if value.trim().is_empty() {
        Some(blank_message)
    } else if value.chars().count() > MAX_NAME_CHARS {
        Some(too_long_message)
    } else {
        None
    }
}

fn check_email(value: &str) -> Option<&'static str> {
    if value.trim().is_empty() {
        Some("Email is required")
    } else if value.chars().count() > MAX_EMAIL_CHARS {
        Some("Email cannot be more than 255 characters")
    } else if !EMAIL_RE.is_match(value) {
        Some("Please enter a valid email")
    } else {
        None
    }
}

/// Field-level validation failure for `StudentInput`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentValidationError {
    /// Wire field name (camelCase) to human-readable message.
    pub field_errors: BTreeMap<String, String>,
}

impl Display for StudentValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid student input:")?;
        for (field, message) in &self.field_errors {
            write!(f, " {field}: {message};")?;
        }
        Ok(())
    }
}

impl Error for StudentValidationError {}

/// Caller-facing projection of a stored student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentView {
    pub student_id: StudentId,
    pub roll_number: RollNumber,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub date_of_birth: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Student> for StudentView {
    fn from(value: Student) -> Self {
        Self {
            student_id: value.id,
            roll_number: value.roll_number,
            first_name: value.first_name,
            last_name: value.last_name,
            email: value.email,
            date_of_birth: value.date_of_birth,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{check_email, StudentInput};
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn email_syntax_rules() {
        assert_eq!(check_email("john.doe@test.com"), None);
        assert_eq!(check_email("a+b@sub.example.org"), None);
        assert_eq!(check_email("   "), Some("Email is required"));
        assert_eq!(check_email("no-at-sign"), Some("Please enter a valid email"));
        assert_eq!(check_email("two@@test.com"), Some("Please enter a valid email"));
        assert_eq!(check_email("x@-bad.com"), Some("Please enter a valid email"));
        assert_eq!(check_email(".john@test.com"), Some("Please enter a valid email"));
        assert_eq!(check_email("john.@test.com"), Some("Please enter a valid email"));
        assert_eq!(check_email("john..doe@test.com"), Some("Please enter a valid email"));
        assert_eq!(check_email("john.q.doe@test.com"), None);
    }

    #[test]
    fn date_of_birth_today_is_rejected() {
        let today = date(2024, 6, 1);
        let input = StudentInput::new("John", "Doe", "john.doe@test.com", today);
        let err = input.validate_at(today).expect_err("today is not in the past");
        assert_eq!(
            err.field_errors.get("dateOfBirth").map(String::as_str),
            Some("Date of Birth must be in the past")
        );

        let yesterday = date(2024, 5, 31);
        let input = StudentInput::new("John", "Doe", "john.doe@test.com", yesterday);
        assert!(input.validate_at(today).is_ok());
    }

    #[test]
    fn name_limit_counts_characters() {
        let today = date(2024, 6, 1);
        let fifty_wide = "é".repeat(50);
        let input = StudentInput::new(fifty_wide.as_str(), "Doe", "j@test.com", date(2000, 1, 1));
        assert!(input.validate_at(today).is_ok());

        let fifty_one = "é".repeat(51);
        let input = StudentInput::new(fifty_one.as_str(), "Doe", "j@test.com", date(2000, 1, 1));
        let err = input.validate_at(today).expect_err("51 chars must fail");
        assert_eq!(
            err.field_errors.get("firstName").map(String::as_str),
            Some("First Name cannot be more than 50 characters")
        );
    }
}
