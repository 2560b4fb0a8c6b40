//! Create-or-update against the object store

use crate::error::StoreError;
use crate::traits::ObjectStore;
use esc_types::{ObjectKey, Resource};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a `create_or_update` call did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationResult {
    Created,
    Updated,
    Unchanged,
}

impl fmt::Display for OperationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationResult::Created => write!(f, "created"),
            OperationResult::Updated => write!(f, "updated"),
            OperationResult::Unchanged => write!(f, "unchanged"),
        }
    }
}

/// Fetch the object at `key` (or start from an empty one), run `patch` on it
/// and write the result back only if the patch changed anything.
///
/// The update is conditioned on the version that was read, so a concurrent
/// writer surfaces as `StoreError::Conflict`.
pub async fn create_or_update<S, R, E, F>(
    store: &S,
    key: &ObjectKey,
    patch: F,
) -> Result<(R, OperationResult), E>
where
    S: ObjectStore,
    R: Resource,
    E: From<StoreError>,
    F: FnOnce(R) -> Result<R, E>,
{
    match store.find::<R>(key).await? {
        None => {
            let desired = patch(R::empty(key))?;
            let created = store.create(desired).await?;
            Ok((created, OperationResult::Created))
        }
        Some(existing) => {
            let desired = patch(existing.clone())?;
            if desired == existing {
                return Ok((existing, OperationResult::Unchanged));
            }
            let updated = store.update(desired).await?;
            Ok((updated, OperationResult::Updated))
        }
    }
}
