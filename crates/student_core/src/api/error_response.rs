//! Structured error payload for lifecycle failures.

use crate::service::student_service::StudentError;
use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Error body returned for not-found, duplicate, validation and unexpected
/// failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorResponse {
    /// UTC wall clock formatted as `yyyy-MM-ddTHH:mm:ss`.
    pub timestamp: String,
    pub status: u16,
    /// Machine-readable code such as `STUDENT_NOT_FOUND`.
    pub error: String,
    pub message: String,
    /// Request path that produced the failure.
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_errors: Option<BTreeMap<String, String>>,
}

impl ApiErrorResponse {
    /// Builds the payload for `err` at the current time.
    pub fn from_error(err: &StudentError, path: impl Into<String>) -> Self {
        Self::from_error_at(err, path, Utc::now().naive_utc())
    }

    /// Builds the payload for `err` with an explicit timestamp.
    pub fn from_error_at(
        err: &StudentError,
        path: impl Into<String>,
        at: NaiveDateTime,
    ) -> Self {
        Self {
            timestamp: at.format(TIMESTAMP_FORMAT).to_string(),
            status: err.status(),
            error: err.error_code().to_string(),
            message: err.to_string(),
            path: path.into(),
            field_errors: err.field_errors().cloned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ApiErrorResponse;
    use crate::repo::student_repo::RepoError;
    use crate::service::student_service::StudentError;
    use chrono::NaiveDate;

    #[test]
    fn unexpected_errors_hide_store_details() {
        let err = StudentError::Unexpected(RepoError::InvalidData("secret detail".to_string()));
        let at = NaiveDate::from_ymd_opt(2025, 8, 23)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap();

        let response = ApiErrorResponse::from_error_at(&err, "/api/v1/students", at);

        assert_eq!(response.timestamp, "2025-08-23T10:30:00");
        assert_eq!(response.status, 500);
        assert_eq!(response.error, "INTERNAL_SERVER_ERROR");
        assert_eq!(response.message, "An unexpected error occurred");
        assert!(!response.message.contains("secret"));
        assert!(response.field_errors.is_none());
    }
}
