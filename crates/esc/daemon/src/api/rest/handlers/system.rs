//! System handlers

use crate::api::rest::state::AppState;
use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ShutdownResponse {
    pub message: String,
}

/// Request a graceful shutdown of the daemon
pub async fn shutdown_daemon(State(state): State<AppState>) -> (StatusCode, Json<ShutdownResponse>) {
    tracing::info!("Shutdown requested over the API");
    state.shutdown_tx.send_replace(true);

    (
        StatusCode::ACCEPTED,
        Json(ShutdownResponse {
            message: "Shutdown initiated".to_string(),
        }),
    )
}
