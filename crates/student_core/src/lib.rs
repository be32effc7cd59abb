//! Core domain logic for the student registry.
//! This crate is the single source of truth for student record invariants.

pub mod api;
pub mod db;
pub mod health;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use api::{ApiErrorResponse, StudentOperation};
pub use health::{check_health, DatabaseHealth, HealthReport, HealthStatus};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::student::{
    NewStudent, RollNumber, Student, StudentId, StudentInput, StudentValidationError, StudentView,
};
pub use repo::student_repo::{
    RepoError, RepoResult, SqliteStudentRepository, StudentRepository, UniqueField,
};
pub use service::student_service::{
    apply_changed_email_update, apply_same_email_update, StudentError, StudentKey, StudentResult,
    StudentService,
};

/// Minimal liveness probe.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
