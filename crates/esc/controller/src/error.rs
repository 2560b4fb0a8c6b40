//! Reconciliation error types

use esc_store::StoreError;
use esc_types::{ObjectKey, RegistryError, ResourceKind};
use std::fmt;
use thiserror::Error;

/// Store operation that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    Get,
    List,
    Apply,
    Delete,
    RegisterIndex,
}

impl fmt::Display for StoreOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreOp::Get => write!(f, "get"),
            StoreOp::List => write!(f, "list"),
            StoreOp::Apply => write!(f, "apply"),
            StoreOp::Delete => write!(f, "delete"),
            StoreOp::RegisterIndex => write!(f, "register index"),
        }
    }
}

/// Reconciliation errors
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The Userland references a Template that does not exist (yet)
    #[error("template {template:?} referenced by userland {userland} not found")]
    TemplateNotFound { userland: ObjectKey, template: String },

    /// Optimistic concurrency failure
    #[error("{kind} {key} was modified concurrently")]
    Conflict { kind: ResourceKind, key: ObjectKey },

    /// The platform rejected a change to an immutable field
    #[error("{kind} {key} rejected change to immutable field {field}")]
    ImmutableField {
        kind: ResourceKind,
        key: ObjectKey,
        field: &'static str,
    },

    /// The derived name is already controlled by a different owner
    #[error("{kind} {key} is already controlled by {owner_kind} {owner:?}")]
    OwnershipConflict {
        kind: ResourceKind,
        key: ObjectKey,
        owner_kind: String,
        owner: String,
    },

    #[error("failed to {op} {kind} {namespace}/{name}: {source}")]
    Store {
        op: StoreOp,
        kind: ResourceKind,
        namespace: String,
        name: String,
        #[source]
        source: StoreError,
    },

    /// A converge step failed after other resources of the pass were applied
    #[error("partially applied ({}): {source}", .applied.join(", "))]
    PartialApply {
        applied: Vec<String>,
        #[source]
        source: Box<ReconcileError>,
    },

    #[error("type registry error: {0}")]
    Registry(#[from] RegistryError),
}

impl ReconcileError {
    /// Attribute a store failure to an operation on one object
    pub fn from_store(op: StoreOp, kind: ResourceKind, key: &ObjectKey, err: StoreError) -> Self {
        match err {
            StoreError::Conflict { kind, key, .. } => ReconcileError::Conflict { kind, key },
            StoreError::Invalid { kind, key, field } => {
                ReconcileError::ImmutableField { kind, key, field }
            }
            source => ReconcileError::Store {
                op,
                kind,
                namespace: key.namespace.clone(),
                name: key.name.clone(),
                source,
            },
        }
    }

    /// Whether retrying the pass can succeed without outside action
    pub fn is_retryable(&self) -> bool {
        match self {
            ReconcileError::TemplateNotFound { .. } | ReconcileError::Conflict { .. } => true,
            ReconcileError::Store { .. } => true,
            ReconcileError::ImmutableField { .. }
            | ReconcileError::OwnershipConflict { .. }
            | ReconcileError::Registry(_) => false,
            ReconcileError::PartialApply { source, .. } => source.is_retryable(),
        }
    }

    /// Whether an operator has to step in (e.g. recreate a resource)
    pub fn requires_intervention(&self) -> bool {
        match self {
            ReconcileError::ImmutableField { .. }
            | ReconcileError::OwnershipConflict { .. }
            | ReconcileError::Registry(_) => true,
            ReconcileError::PartialApply { source, .. } => source.requires_intervention(),
            _ => false,
        }
    }
}

/// Result type for reconciliation
pub type Result<T> = std::result::Result<T, ReconcileError>;
