//! Boundary contract for request layers.
//!
//! # Responsibility
//! - Name each lifecycle operation and its success status.
//! - Shape lifecycle failures into the structured error payload.
//!
//! # Invariants
//! - `Unexpected` failures never expose store internals in the payload.
//! - `fieldErrors` is present only for validation failures.

pub mod error_response;

pub use error_response::ApiErrorResponse;

/// Lifecycle operation as seen by a request layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StudentOperation {
    Create,
    GetById,
    GetByEmail,
    GetByRollNumber,
    ListAll,
    Update,
    DeleteById,
    DeleteByRollNumber,
}

impl StudentOperation {
    /// Status code reported when the operation succeeds.
    pub fn success_status(self) -> u16 {
        match self {
            Self::Create => 201,
            Self::GetById
            | Self::GetByEmail
            | Self::GetByRollNumber
            | Self::ListAll
            | Self::Update => 200,
            Self::DeleteById | Self::DeleteByRollNumber => 204,
        }
    }

    /// Whether a successful response carries a body.
    pub fn has_success_body(self) -> bool {
        self.success_status() != 204
    }
}

#[cfg(test)]
mod tests {
    use super::StudentOperation;

    #[test]
    fn success_statuses_match_operation_kind() {
        assert_eq!(StudentOperation::Create.success_status(), 201);
        assert_eq!(StudentOperation::GetByEmail.success_status(), 200);
        assert_eq!(StudentOperation::Update.success_status(), 200);
        assert_eq!(StudentOperation::ListAll.success_status(), 200);
        assert_eq!(StudentOperation::DeleteByRollNumber.success_status(), 204);
        assert!(!StudentOperation::DeleteById.has_success_body());
        assert!(StudentOperation::Create.has_success_body());
    }
}
