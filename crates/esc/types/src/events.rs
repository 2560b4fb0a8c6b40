//! Controller events
//!
//! Events are attached to the Userland they concern and make the controller's
//! decisions observable (deletions, retained claims, missing templates).

use crate::ids::{ObjectKey, Uid};
use crate::resource::ResourceKind;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Envelope wrapping every recorded event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub id: Uuid,

    pub timestamp: chrono::DateTime<chrono::Utc>,

    /// Component that recorded the event
    pub source: String,

    pub severity: EventSeverity,

    /// Object the event is about
    pub involved_object: ObjectReference,

    pub event: EscEvent,
}

impl EventEnvelope {
    pub fn new(
        source: impl Into<String>,
        involved_object: ObjectReference,
        event: EscEvent,
        severity: EventSeverity,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: chrono::Utc::now(),
            source: source.into(),
            severity,
            involved_object,
            event,
        }
    }
}

/// Severity, matching the platform's Normal/Warning event types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventSeverity {
    Normal,
    Warning,
}

/// Reference to the object an event concerns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectReference {
    pub kind: ResourceKind,
    pub key: ObjectKey,
    pub uid: Option<Uid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EscEvent {
    /// A derived resource no longer matching the binding was deleted
    ResourceDeleted { kind: ResourceKind, name: String },

    /// A stale storage claim was kept instead of deleted
    ClaimRetained { name: String },

    /// The referenced Template does not exist
    TemplateNotFound { template_name: String },
}

impl EscEvent {
    /// Short machine-readable reason
    pub fn reason(&self) -> &'static str {
        match self {
            EscEvent::ResourceDeleted { .. } => "Deleted",
            EscEvent::ClaimRetained { .. } => "Retained",
            EscEvent::TemplateNotFound { .. } => "TemplateNotFound",
        }
    }

    /// Human-readable message
    pub fn message(&self) -> String {
        match self {
            EscEvent::ResourceDeleted { kind, name } => {
                format!("Deleted {} {:?}", kind.as_str().to_lowercase(), name)
            }
            EscEvent::ClaimRetained { name } => {
                format!("Retained storage claim {:?} no longer referenced", name)
            }
            EscEvent::TemplateNotFound { template_name } => {
                format!("Template {:?} not found", template_name)
            }
        }
    }
}
