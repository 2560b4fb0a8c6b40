//! API Router configuration

use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the main API router
pub fn create_router(state: AppState, enable_cors: bool) -> Router {
    let api_routes = Router::new()
        // Health and status
        .route("/health", get(handlers::health_check))
        .route("/status", get(handlers::daemon_status))
        .route("/system/shutdown", post(handlers::shutdown_daemon))
        // Templates
        .route("/namespaces/:ns/templates", get(handlers::list_templates))
        .route(
            "/namespaces/:ns/templates/:name",
            get(handlers::get_template)
                .put(handlers::put_template)
                .delete(handlers::delete_template),
        )
        // Userlands
        .route("/namespaces/:ns/userlands", get(handlers::list_userlands))
        .route(
            "/namespaces/:ns/userlands/:name",
            get(handlers::get_userland)
                .put(handlers::put_userland)
                .delete(handlers::delete_userland),
        )
        // Derived resources
        .route("/namespaces/:ns/workloads", get(handlers::list_workloads))
        .route("/namespaces/:ns/services", get(handlers::list_services))
        .route(
            "/namespaces/:ns/storageclaims",
            get(handlers::list_storage_claims),
        )
        // Events
        .route("/events", get(handlers::get_events))
        .route("/events/stream", get(handlers::stream_events));

    let router = Router::new()
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http());

    let router = if enable_cors {
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else {
        router
    };

    router.with_state(state)
}
