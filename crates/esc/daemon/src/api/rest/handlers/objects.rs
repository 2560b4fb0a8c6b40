//! Generic object handlers shared by the typed routes

use crate::error::{ApiError, ApiResult};
use esc_store::{create_or_update, InMemoryStore, ListSelector, ObjectStore, OperationResult};
use esc_types::{ObjectKey, Resource};
use serde::Serialize;

/// Object written by a PUT, with what the write did
#[derive(Debug, Serialize)]
pub struct AppliedObject<R> {
    pub operation: OperationResult,
    pub object: R,
}

/// Delete response
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: bool,
}

pub(super) async fn list_objects<R: Resource>(
    store: &InMemoryStore,
    namespace: &str,
    selector: &ListSelector,
) -> ApiResult<Vec<R>> {
    Ok(store.list(Some(namespace), selector).await?)
}

pub(super) async fn get_object<R: Resource>(store: &InMemoryStore, key: &ObjectKey) -> ApiResult<R> {
    store
        .find(key)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("{} {} not found", R::KIND, key)))
}

/// Create or update the object at `key`, replacing what `patch` sets
pub(super) async fn apply_object<R, F>(
    store: &InMemoryStore,
    key: &ObjectKey,
    patch: F,
) -> ApiResult<AppliedObject<R>>
where
    R: Resource,
    F: FnOnce(&mut R),
{
    let (object, operation) = create_or_update(store, key, |mut object: R| {
        patch(&mut object);
        Ok::<R, ApiError>(object)
    })
    .await?;

    tracing::info!(kind = %R::KIND, key = %key, operation = %operation, "Applied object");
    Ok(AppliedObject { operation, object })
}

pub(super) async fn delete_object<R: Resource>(
    store: &InMemoryStore,
    key: &ObjectKey,
) -> ApiResult<DeleteResponse> {
    store.delete::<R>(key).await?;
    tracing::info!(kind = %R::KIND, key = %key, "Deleted object");
    Ok(DeleteResponse { deleted: true })
}
