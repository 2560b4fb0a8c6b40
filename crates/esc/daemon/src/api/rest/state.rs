//! Application state for API handlers

use crate::event_log::EventLog;
use esc_controller::{ControllerStats, EventRecorder, WorkQueue};
use esc_store::InMemoryStore;
use esc_types::TypeRegistry;
use std::sync::Arc;
use tokio::sync::watch;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Object store
    pub store: Arc<InMemoryStore>,

    /// Type registry, for ownership index lookups
    pub registry: Arc<TypeRegistry>,

    /// Recent controller events
    pub event_log: Arc<EventLog>,

    /// Live controller events, for streaming
    pub recorder: EventRecorder,

    /// Controller counters
    pub stats: Arc<ControllerStats>,

    /// Controller work queue, for its depth
    pub queue: Arc<WorkQueue>,

    /// Daemon version
    pub version: String,

    /// Daemon start time
    pub started_at: chrono::DateTime<chrono::Utc>,

    /// Graceful shutdown signal sender
    pub shutdown_tx: watch::Sender<bool>,
}

impl AppState {
    pub fn new(
        store: Arc<InMemoryStore>,
        registry: Arc<TypeRegistry>,
        event_log: Arc<EventLog>,
        recorder: EventRecorder,
        stats: Arc<ControllerStats>,
        queue: Arc<WorkQueue>,
        shutdown_tx: watch::Sender<bool>,
    ) -> Self {
        Self {
            store,
            registry,
            event_log,
            recorder,
            stats,
            queue,
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: chrono::Utc::now(),
            shutdown_tx,
        }
    }

    /// Get uptime as a human-readable string
    pub fn uptime(&self) -> String {
        let secs = (chrono::Utc::now() - self.started_at).num_seconds();

        if secs < 60 {
            format!("{}s", secs)
        } else if secs < 3600 {
            format!("{}m {}s", secs / 60, secs % 60)
        } else if secs < 86400 {
            format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
        } else {
            format!("{}d {}h", secs / 86400, (secs % 86400) / 3600)
        }
    }
}
