//! Derived resource handlers (read-only)

use super::objects::list_objects;
use crate::api::rest::state::AppState;
use crate::error::{ApiError, ApiResult};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use esc_controller::ownership::owned_by;
use esc_store::ListSelector;
use esc_types::{Resource, Service, StorageClaim, Workload};
use serde::Deserialize;

/// Optional owner filter
#[derive(Debug, Deserialize)]
pub struct OwnerQuery {
    /// Name of the controlling Userland
    pub owner: Option<String>,
}

impl OwnerQuery {
    fn selector(&self, state: &AppState) -> ApiResult<ListSelector> {
        match &self.owner {
            Some(owner) => owned_by(&state.registry, owner)
                .map_err(|e| ApiError::Internal(e.to_string())),
            None => Ok(ListSelector::All),
        }
    }
}

async fn list_derived<R: Resource>(
    state: &AppState,
    ns: &str,
    query: &OwnerQuery,
) -> ApiResult<Json<Vec<R>>> {
    let selector = query.selector(state)?;
    Ok(Json(list_objects(&state.store, ns, &selector).await?))
}

/// List Workloads, optionally only those owned by a Userland
pub async fn list_workloads(
    State(state): State<AppState>,
    Path(ns): Path<String>,
    Query(query): Query<OwnerQuery>,
) -> ApiResult<Json<Vec<Workload>>> {
    list_derived(&state, &ns, &query).await
}

/// List Services, optionally only those owned by a Userland
pub async fn list_services(
    State(state): State<AppState>,
    Path(ns): Path<String>,
    Query(query): Query<OwnerQuery>,
) -> ApiResult<Json<Vec<Service>>> {
    list_derived(&state, &ns, &query).await
}

/// List StorageClaims, optionally only those owned by a Userland
pub async fn list_storage_claims(
    State(state): State<AppState>,
    Path(ns): Path<String>,
    Query(query): Query<OwnerQuery>,
) -> ApiResult<Json<Vec<StorageClaim>>> {
    list_derived(&state, &ns, &query).await
}
