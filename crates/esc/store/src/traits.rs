//! Object store trait definition

use crate::error::{Result, StoreError};
use async_trait::async_trait;
use esc_types::{ObjectKey, OwnerReference, Resource, ResourceKind};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Field index function: the index values an object is filed under
pub type IndexFn<R> = Arc<dyn Fn(&R) -> Vec<String> + Send + Sync>;

/// Which objects a `list` returns
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListSelector {
    All,
    /// Objects filed under `value` in the field index `index`
    MatchingField { index: String, value: String },
}

impl ListSelector {
    pub fn matching_field(index: impl Into<String>, value: impl Into<String>) -> Self {
        ListSelector::MatchingField {
            index: index.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchAction {
    Added,
    Modified,
    Deleted,
}

/// Change notification
#[derive(Debug, Clone)]
pub struct WatchEvent {
    pub kind: ResourceKind,
    pub action: WatchAction,
    pub key: ObjectKey,
    /// Owner references of the object after the change (before, for deletes)
    pub owners: Vec<OwnerReference>,
}

/// Persistent object store
///
/// Methods are generic over the stored type, so the trait is used through
/// generics rather than trait objects.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch an object, failing with `NotFound`
    async fn get<R: Resource>(&self, key: &ObjectKey) -> Result<R>;

    /// List objects, optionally restricted to one namespace
    async fn list<R: Resource>(
        &self,
        namespace: Option<&str>,
        selector: &ListSelector,
    ) -> Result<Vec<R>>;

    /// Create a new object; the returned copy carries system fields
    async fn create<R: Resource>(&self, object: R) -> Result<R>;

    /// Replace an object, conditioned on its resource version
    async fn update<R: Resource>(&self, object: R) -> Result<R>;

    /// Delete an object and everything it owns
    async fn delete<R: Resource>(&self, key: &ObjectKey) -> Result<()>;

    /// Register a field index for one kind
    async fn register_index<R: Resource>(&self, index: &str, key_fn: IndexFn<R>) -> Result<()>;

    /// Subscribe to change notifications
    fn watch(&self) -> broadcast::Receiver<WatchEvent>;

    /// Fetch an object, mapping `NotFound` to `None`
    async fn find<R: Resource>(&self, key: &ObjectKey) -> Result<Option<R>> {
        match self.get::<R>(key).await {
            Ok(object) => Ok(Some(object)),
            Err(StoreError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
