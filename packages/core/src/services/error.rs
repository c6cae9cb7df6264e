//! Service Layer Error Types
//!
//! Field validation errors stay local to a form and are never sent to the
//! store; store failures keep the operation name from the store layer.

use crate::db::StoreError;
use crate::models::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Per-field validation error, keyed the way form controls report them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldError {
    Required,
    InvalidJson,
}

impl FieldError {
    pub fn code(&self) -> &'static str {
        match self {
            FieldError::Required => "required",
            FieldError::InvalidJson => "invalidJson",
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One failing control: which group, which field, which validator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationFailure {
    pub group_id: String,
    pub field_key: String,
    pub error: FieldError,
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field_key, self.error)
    }
}

/// Service operation errors
#[derive(Error, Debug)]
pub enum ServiceError {
    /// The store call failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Form validation blocked submission; nothing was sent
    #[error("Validation failed: {}", format_failures(.0))]
    Validation(Vec<ValidationFailure>),

    /// A stored document (collection, view) could not be decoded
    #[error("Invalid document: {0}")]
    InvalidDocument(#[from] ValidationError),
}

impl ServiceError {
    /// Message suitable for showing next to a failed save or load
    pub fn user_message(&self) -> String {
        match self {
            ServiceError::Store(err) if err.is_not_found() => {
                "The record no longer exists.".to_string()
            }
            ServiceError::Store(err) => {
                format!("Could not complete {}: {}", err.operation, err.source)
            }
            ServiceError::Validation(failures) => format!(
                "Please fix the highlighted fields: {}",
                failures
                    .iter()
                    .map(|f| f.field_key.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            ServiceError::InvalidDocument(err) => format!("The definition is invalid: {err}"),
        }
    }
}

fn format_failures(failures: &[ValidationFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::StoreOperation;

    #[test]
    fn test_field_error_codes() {
        assert_eq!(FieldError::Required.to_string(), "required");
        assert_eq!(
            serde_json::to_value(FieldError::InvalidJson).unwrap(),
            serde_json::json!("invalidJson")
        );
    }

    #[test]
    fn test_validation_error_display() {
        let err = ServiceError::Validation(vec![ValidationFailure {
            group_id: "main".to_string(),
            field_key: "title".to_string(),
            error: FieldError::Required,
        }]);
        assert_eq!(err.to_string(), "Validation failed: title: required");
        assert_eq!(
            err.user_message(),
            "Please fix the highlighted fields: title"
        );
    }

    #[test]
    fn test_store_error_user_message() {
        let err = ServiceError::from(StoreError::not_found(StoreOperation::Update, 3));
        assert_eq!(err.user_message(), "The record no longer exists.");

        let err = ServiceError::from(StoreError::rejected(StoreOperation::Create, "bad type"));
        assert_eq!(
            err.user_message(),
            "Could not complete create: Rejected by store: bad type"
        );
    }
}
