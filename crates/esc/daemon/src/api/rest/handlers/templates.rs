//! Template handlers

use super::objects::{apply_object, delete_object, get_object, list_objects};
use super::{AppliedObject, DeleteResponse};
use crate::api::rest::state::AppState;
use crate::error::ApiResult;
use axum::{
    extract::{Path, State},
    Json,
};
use esc_store::ListSelector;
use esc_types::{ObjectKey, Template, TemplateSpec};

/// List Templates in a namespace
pub async fn list_templates(
    State(state): State<AppState>,
    Path(ns): Path<String>,
) -> ApiResult<Json<Vec<Template>>> {
    let templates = list_objects(&state.store, &ns, &ListSelector::All).await?;
    Ok(Json(templates))
}

/// Get a Template
pub async fn get_template(
    State(state): State<AppState>,
    Path((ns, name)): Path<(String, String)>,
) -> ApiResult<Json<Template>> {
    let template = get_object(&state.store, &ObjectKey::new(ns, name)).await?;
    Ok(Json(template))
}

/// Create or replace a Template's spec
pub async fn put_template(
    State(state): State<AppState>,
    Path((ns, name)): Path<(String, String)>,
    Json(spec): Json<TemplateSpec>,
) -> ApiResult<Json<AppliedObject<Template>>> {
    let key = ObjectKey::new(ns, name);
    let applied = apply_object(&state.store, &key, |template: &mut Template| {
        template.spec = spec;
    })
    .await?;
    Ok(Json(applied))
}

/// Delete a Template
pub async fn delete_template(
    State(state): State<AppState>,
    Path((ns, name)): Path<(String, String)>,
) -> ApiResult<Json<DeleteResponse>> {
    let deleted = delete_object::<Template>(&state.store, &ObjectKey::new(ns, name)).await?;
    Ok(Json(deleted))
}
