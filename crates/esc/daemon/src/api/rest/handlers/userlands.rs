//! Userland handlers
//!
//! Deleting a Userland removes everything it owns, storage claims included.

use super::objects::{apply_object, delete_object, get_object, list_objects};
use super::{AppliedObject, DeleteResponse};
use crate::api::rest::state::AppState;
use crate::error::{ApiError, ApiResult};
use axum::{
    extract::{Path, State},
    Json,
};
use esc_store::ListSelector;
use esc_types::{ObjectKey, Userland, UserlandSpec};

/// List Userlands in a namespace
pub async fn list_userlands(
    State(state): State<AppState>,
    Path(ns): Path<String>,
) -> ApiResult<Json<Vec<Userland>>> {
    let userlands = list_objects(&state.store, &ns, &ListSelector::All).await?;
    Ok(Json(userlands))
}

/// Get a Userland
pub async fn get_userland(
    State(state): State<AppState>,
    Path((ns, name)): Path<(String, String)>,
) -> ApiResult<Json<Userland>> {
    let userland = get_object(&state.store, &ObjectKey::new(ns, name)).await?;
    Ok(Json(userland))
}

/// Create or replace a Userland's spec
pub async fn put_userland(
    State(state): State<AppState>,
    Path((ns, name)): Path<(String, String)>,
    Json(spec): Json<UserlandSpec>,
) -> ApiResult<Json<AppliedObject<Userland>>> {
    if spec.template_name.is_empty() {
        return Err(ApiError::BadRequest(
            "templateName must not be empty".to_string(),
        ));
    }

    let key = ObjectKey::new(ns, name);
    let applied = apply_object(&state.store, &key, |userland: &mut Userland| {
        userland.spec = spec;
    })
    .await?;
    Ok(Json(applied))
}

/// Delete a Userland and its derived resources
pub async fn delete_userland(
    State(state): State<AppState>,
    Path((ns, name)): Path<(String, String)>,
) -> ApiResult<Json<DeleteResponse>> {
    let deleted = delete_object::<Userland>(&state.store, &ObjectKey::new(ns, name)).await?;
    Ok(Json(deleted))
}
