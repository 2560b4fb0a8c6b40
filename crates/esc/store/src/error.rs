//! Store error types

use esc_types::{ObjectKey, ResourceKind};
use thiserror::Error;

/// Object store errors
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("{kind} {key} not found")]
    NotFound { kind: ResourceKind, key: ObjectKey },

    #[error("{kind} {key} already exists")]
    AlreadyExists { kind: ResourceKind, key: ObjectKey },

    /// Optimistic concurrency failure
    #[error("conflict on {kind} {key}: expected version {expected}, current {current}")]
    Conflict {
        kind: ResourceKind,
        key: ObjectKey,
        expected: u64,
        current: u64,
    },

    #[error("{kind} {key} is invalid: field {field} is immutable")]
    Invalid {
        kind: ResourceKind,
        key: ObjectKey,
        field: &'static str,
    },

    #[error("index {index:?} is not registered for {kind}")]
    IndexNotRegistered { kind: ResourceKind, index: String },

    #[error("index {index:?} is already registered for {kind}")]
    IndexAlreadyRegistered { kind: ResourceKind, index: String },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;
