//! In-memory object store for development and testing
//!
//! All state sits behind one `RwLock`, so an object and its index entries are
//! always updated together.

use crate::error::{Result, StoreError};
use crate::traits::{IndexFn, ListSelector, ObjectStore, WatchAction, WatchEvent};
use async_trait::async_trait;
use esc_types::{ObjectKey, ObjectMeta, Resource, ResourceKind, Uid};
use std::any::Any;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tokio::sync::{broadcast, RwLock};

/// Channel capacity for watch notifications
const WATCH_CHANNEL_CAPACITY: usize = 1024;

type ObjectRef = (ResourceKind, ObjectKey);
type IndexId = (ResourceKind, String);

struct StoredObject {
    value: serde_json::Value,
    meta: ObjectMeta,
    /// Index values this object is currently filed under, by index name
    index_values: BTreeMap<String, Vec<String>>,
}

struct Indexer {
    /// Holds an `IndexFn<R>` for the indexed kind
    key_fn: Box<dyn Any + Send + Sync>,
    table: BTreeMap<String, BTreeSet<ObjectKey>>,
}

#[derive(Default)]
struct StoreState {
    objects: BTreeMap<ObjectRef, StoredObject>,
    indexes: HashMap<IndexId, Indexer>,
    last_version: u64,
    last_serial: u64,
}

impl StoreState {
    fn index_values<R: Resource>(&self, object: &R) -> BTreeMap<String, Vec<String>> {
        self.indexes
            .iter()
            .filter(|((kind, _), _)| *kind == R::KIND)
            .filter_map(|((_, name), indexer)| {
                indexer
                    .key_fn
                    .downcast_ref::<IndexFn<R>>()
                    .map(|key_fn| (name.clone(), key_fn(object)))
            })
            .collect()
    }

    fn insert<R: Resource>(&mut self, object: &R) -> Result<()> {
        let key = object.key();
        let value = serde_json::to_value(object)?;
        let index_values = self.index_values(object);

        for (index, values) in &index_values {
            if let Some(indexer) = self.indexes.get_mut(&(R::KIND, index.clone())) {
                for value in values {
                    indexer
                        .table
                        .entry(value.clone())
                        .or_default()
                        .insert(key.clone());
                }
            }
        }

        self.objects.insert(
            (R::KIND, key),
            StoredObject {
                value,
                meta: object.meta().clone(),
                index_values,
            },
        );
        Ok(())
    }

    fn unindex(&mut self, kind: ResourceKind, key: &ObjectKey, values: &BTreeMap<String, Vec<String>>) {
        for (index, values) in values {
            if let Some(indexer) = self.indexes.get_mut(&(kind, index.clone())) {
                for value in values {
                    if let Some(keys) = indexer.table.get_mut(value) {
                        keys.remove(key);
                        if keys.is_empty() {
                            indexer.table.remove(value);
                        }
                    }
                }
            }
        }
    }
}

/// In-memory object store
pub struct InMemoryStore {
    state: RwLock<StoreState>,
    watch_tx: broadcast::Sender<WatchEvent>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        let (watch_tx, _) = broadcast::channel(WATCH_CHANNEL_CAPACITY);
        Self {
            state: RwLock::new(StoreState::default()),
            watch_tx,
        }
    }

    /// Number of stored objects of one kind
    pub async fn count(&self, kind: ResourceKind) -> usize {
        let state = self.state.read().await;
        state.objects.keys().filter(|(k, _)| *k == kind).count()
    }

    /// Latest resource version handed out; it only moves on real mutations
    pub async fn current_version(&self) -> u64 {
        self.state.read().await.last_version
    }

    fn notify(&self, kind: ResourceKind, action: WatchAction, meta: &ObjectMeta) {
        // No subscribers is fine
        let _ = self.watch_tx.send(WatchEvent {
            kind,
            action,
            key: meta.key(),
            owners: meta.owner_references.clone(),
        });
    }
}

#[async_trait]
impl ObjectStore for InMemoryStore {
    async fn get<R: Resource>(&self, key: &ObjectKey) -> Result<R> {
        let state = self.state.read().await;
        let stored = state
            .objects
            .get(&(R::KIND, key.clone()))
            .ok_or_else(|| StoreError::NotFound {
                kind: R::KIND,
                key: key.clone(),
            })?;
        Ok(serde_json::from_value(stored.value.clone())?)
    }

    async fn list<R: Resource>(
        &self,
        namespace: Option<&str>,
        selector: &ListSelector,
    ) -> Result<Vec<R>> {
        let state = self.state.read().await;
        let in_namespace = |key: &ObjectKey| namespace.map_or(true, |ns| key.namespace == ns);

        let keys: Vec<ObjectKey> = match selector {
            ListSelector::All => state
                .objects
                .keys()
                .filter(|(kind, key)| *kind == R::KIND && in_namespace(key))
                .map(|(_, key)| key.clone())
                .collect(),
            ListSelector::MatchingField { index, value } => {
                let indexer = state
                    .indexes
                    .get(&(R::KIND, index.clone()))
                    .ok_or_else(|| StoreError::IndexNotRegistered {
                        kind: R::KIND,
                        index: index.clone(),
                    })?;
                indexer
                    .table
                    .get(value)
                    .map(|keys| keys.iter().filter(|k| in_namespace(*k)).cloned().collect())
                    .unwrap_or_default()
            }
        };

        keys.iter()
            .filter_map(|key| state.objects.get(&(R::KIND, key.clone())))
            .map(|stored| serde_json::from_value(stored.value.clone()).map_err(StoreError::from))
            .collect()
    }

    async fn create<R: Resource>(&self, mut object: R) -> Result<R> {
        let key = object.key();
        let mut state = self.state.write().await;

        if state.objects.contains_key(&(R::KIND, key.clone())) {
            return Err(StoreError::AlreadyExists { kind: R::KIND, key });
        }

        state.last_version += 1;
        state.last_serial += 1;
        let meta = object.meta_mut();
        meta.uid = Some(Uid::generate());
        meta.resource_version = Some(state.last_version);
        meta.creation_timestamp = Some(chrono::Utc::now());
        object.admit_create(state.last_serial);

        state.insert(&object)?;
        self.notify(R::KIND, WatchAction::Added, object.meta());

        tracing::debug!(kind = %R::KIND, key = %key, "Created object");
        Ok(object)
    }

    async fn update<R: Resource>(&self, mut object: R) -> Result<R> {
        let key = object.key();
        let mut state = self.state.write().await;

        let stored = state
            .objects
            .get(&(R::KIND, key.clone()))
            .ok_or_else(|| StoreError::NotFound {
                kind: R::KIND,
                key: key.clone(),
            })?;

        let current = stored.meta.resource_version.unwrap_or_default();
        if let Some(expected) = object.meta().resource_version {
            if expected != current {
                return Err(StoreError::Conflict {
                    kind: R::KIND,
                    key,
                    expected,
                    current,
                });
            }
        }

        let previous: R = serde_json::from_value(stored.value.clone())?;
        let previous_index_values = stored.index_values.clone();

        let meta = object.meta_mut();
        meta.uid = previous.meta().uid;
        meta.creation_timestamp = previous.meta().creation_timestamp;
        meta.resource_version = Some(current);

        if object == previous {
            return Ok(previous);
        }

        if let Some(field) = object.immutable_violation(&previous) {
            return Err(StoreError::Invalid {
                kind: R::KIND,
                key,
                field,
            });
        }

        state.last_version += 1;
        object.meta_mut().resource_version = Some(state.last_version);

        state.unindex(R::KIND, &key, &previous_index_values);
        state.insert(&object)?;
        self.notify(R::KIND, WatchAction::Modified, object.meta());

        tracing::debug!(kind = %R::KIND, key = %key, "Updated object");
        Ok(object)
    }

    async fn delete<R: Resource>(&self, key: &ObjectKey) -> Result<()> {
        let mut state = self.state.write().await;

        if !state.objects.contains_key(&(R::KIND, key.clone())) {
            return Err(StoreError::NotFound {
                kind: R::KIND,
                key: key.clone(),
            });
        }

        // Owned objects go with their owner
        let mut pending = vec![(R::KIND, key.clone())];
        while let Some(target) = pending.pop() {
            let Some(stored) = state.objects.remove(&target) else {
                continue;
            };
            state.unindex(target.0, &target.1, &stored.index_values);
            self.notify(target.0, WatchAction::Deleted, &stored.meta);

            if let Some(uid) = stored.meta.uid {
                pending.extend(
                    state
                        .objects
                        .iter()
                        .filter(|(_, o)| o.meta.is_owned_by(&uid))
                        .map(|(r, _)| r.clone()),
                );
            }

            if target.1 != *key || target.0 != R::KIND {
                tracing::debug!(kind = %target.0, key = %target.1, "Cascade deleted owned object");
            }
        }

        tracing::debug!(kind = %R::KIND, key = %key, "Deleted object");
        Ok(())
    }

    async fn register_index<R: Resource>(&self, index: &str, key_fn: IndexFn<R>) -> Result<()> {
        let mut state = self.state.write().await;
        let id = (R::KIND, index.to_string());

        if state.indexes.contains_key(&id) {
            return Err(StoreError::IndexAlreadyRegistered {
                kind: R::KIND,
                index: index.to_string(),
            });
        }

        // Back-fill objects that already exist
        let mut table: BTreeMap<String, BTreeSet<ObjectKey>> = BTreeMap::new();
        let mut filed = Vec::new();
        for ((kind, key), stored) in state.objects.iter() {
            if *kind != R::KIND {
                continue;
            }
            let object: R = serde_json::from_value(stored.value.clone())?;
            let values = key_fn(&object);
            for value in &values {
                table.entry(value.clone()).or_default().insert(key.clone());
            }
            filed.push((key.clone(), values));
        }
        for (key, values) in filed {
            if let Some(stored) = state.objects.get_mut(&(R::KIND, key)) {
                stored.index_values.insert(index.to_string(), values);
            }
        }

        state.indexes.insert(
            id,
            Indexer {
                key_fn: Box::new(key_fn),
                table,
            },
        );

        tracing::debug!(kind = %R::KIND, index = index, "Registered field index");
        Ok(())
    }

    fn watch(&self) -> broadcast::Receiver<WatchEvent> {
        self.watch_tx.subscribe()
    }
}
