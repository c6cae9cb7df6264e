//! HTTP error handling for dev server
//!
//! Error bodies are `{ "message": ..., "code": ... }`, the shape `HttpStore`
//! reads back into a `StoreError`.

use crate::db::{StoreError, StoreFailure};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};

pub const NODE_NOT_FOUND: &str = "NODE_NOT_FOUND";
pub const INVALID_INPUT: &str = "INVALID_INPUT";
pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
pub const STORE_ERROR: &str = "STORE_ERROR";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpError {
    /// User-facing error message
    pub message: String,
    /// Machine-readable error code
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl HttpError {
    pub fn new(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
            details: None,
        }
    }

    pub fn with_details(
        message: impl Into<String>,
        code: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
            details: Some(details.into()),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.code.as_str() {
            NODE_NOT_FOUND => StatusCode::NOT_FOUND,
            INVALID_INPUT | VALIDATION_ERROR => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<StoreError> for HttpError {
    fn from(err: StoreError) -> Self {
        let operation = err.operation.to_string();
        match err.source {
            StoreFailure::NotFound { id } => {
                HttpError::new(format!("Node not found: {}", id), NODE_NOT_FOUND)
            }
            StoreFailure::Rejected(message) => {
                HttpError::with_details(message, VALIDATION_ERROR, operation)
            }
            other => HttpError::with_details(other.to_string(), STORE_ERROR, operation),
        }
    }
}
