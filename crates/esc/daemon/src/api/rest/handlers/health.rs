//! Health and status handlers

use crate::api::rest::state::AppState;
use axum::{extract::State, Json};
use esc_controller::StatsSnapshot;
use esc_types::ResourceKind;
use serde::Serialize;
use std::collections::BTreeMap;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthCheckResponse {
    pub status: String,
    pub version: String,
    pub uptime: String,
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthCheckResponse> {
    Json(HealthCheckResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
        uptime: state.uptime(),
    })
}

/// Daemon status response
#[derive(Debug, Serialize)]
pub struct DaemonStatusResponse {
    pub status: String,
    pub version: String,
    pub uptime: String,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub controller: ControllerStatus,
    /// Stored objects per kind
    pub objects: BTreeMap<ResourceKind, usize>,
    pub recorded_events: usize,
}

#[derive(Debug, Serialize)]
pub struct ControllerStatus {
    #[serde(flatten)]
    pub stats: StatsSnapshot,
    pub queue_depth: usize,
}

/// Daemon status endpoint
pub async fn daemon_status(State(state): State<AppState>) -> Json<DaemonStatusResponse> {
    let mut objects = BTreeMap::new();
    for kind in ResourceKind::ALL {
        objects.insert(kind, state.store.count(kind).await);
    }

    Json(DaemonStatusResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
        uptime: state.uptime(),
        started_at: state.started_at,
        controller: ControllerStatus {
            stats: state.stats.snapshot(),
            queue_depth: state.queue.len().await,
        },
        objects,
        recorded_events: state.event_log.len().await,
    })
}
