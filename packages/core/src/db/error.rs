//! Store Error Types
//!
//! Every failure reaching the caller names the store operation that failed, so
//! a UI can say "saving failed" rather than "something failed".

use crate::models::NodeId;
use std::fmt;
use thiserror::Error;

/// Abstract store endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    GetById,
    GetByType,
    GetByOwner,
    Create,
    Update,
    Delete,
    BatchCreate,
    BatchUpdate,
    CollectionOptions,
}

impl StoreOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreOperation::GetById => "getById",
            StoreOperation::GetByType => "getByType",
            StoreOperation::GetByOwner => "getByOwner",
            StoreOperation::Create => "create",
            StoreOperation::Update => "update",
            StoreOperation::Delete => "delete",
            StoreOperation::BatchCreate => "batchCreate",
            StoreOperation::BatchUpdate => "batchUpdate",
            StoreOperation::CollectionOptions => "collectionOptions",
        }
    }
}

impl fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What went wrong underneath a store operation
#[derive(Error, Debug)]
pub enum StoreFailure {
    /// Target record does not exist
    #[error("Node not found: {id}")]
    NotFound { id: NodeId },

    /// Store refused the payload
    #[error("Rejected by store: {0}")]
    Rejected(String),

    /// Transport-level failure (connect, timeout, TLS)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Store answered with a non-success status
    #[error("Store responded with status {status}: {message}")]
    Status { status: u16, message: String },

    /// Response body could not be decoded
    #[error("Invalid store response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Failure of one store call, tagged with the operation name
#[derive(Error, Debug)]
#[error("Store operation {operation} failed: {source}")]
pub struct StoreError {
    pub operation: StoreOperation,
    #[source]
    pub source: StoreFailure,
}

impl StoreError {
    pub fn new(operation: StoreOperation, source: impl Into<StoreFailure>) -> Self {
        Self {
            operation,
            source: source.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(operation: StoreOperation, id: NodeId) -> Self {
        Self::new(operation, StoreFailure::NotFound { id })
    }

    /// Create a rejected-payload error
    pub fn rejected(operation: StoreOperation, msg: impl Into<String>) -> Self {
        Self::new(operation, StoreFailure::Rejected(msg.into()))
    }

    /// Create a non-success status error
    pub fn status(operation: StoreOperation, status: u16, message: impl Into<String>) -> Self {
        Self::new(
            operation,
            StoreFailure::Status {
                status,
                message: message.into(),
            },
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.source, StoreFailure::NotFound { .. })
    }
}

/// Result alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;
