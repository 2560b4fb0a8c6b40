//! Ownership index and controller references
//!
//! Owned resources are filed under `OWNER_INDEX` by the `apiVersion/kind/name`
//! of their controlling Userland. The store keeps the index current; the
//! controller only registers it once and queries it.

use crate::error::{ReconcileError, Result, StoreOp};
use esc_store::{IndexFn, ListSelector, ObjectStore};
use esc_types::{
    ObjectKey, OwnerReference, Resource, ResourceKind, Service, StorageClaim, TypeRegistry,
    Userland, Workload,
};
use std::sync::Arc;

/// Field index of owned resources by controlling Userland
pub const OWNER_INDEX: &str = ".metadata.controller";

/// Field index of Userlands by the Template they reference
pub const TEMPLATE_INDEX: &str = "spec.templateName";

/// Index function filing an object under its controlling Userland, if any
pub fn owner_index_fn<R: Resource>(registry: &TypeRegistry) -> Result<IndexFn<R>> {
    let api_version = registry.api_version(ResourceKind::Userland)?.to_string();
    let kind = ResourceKind::Userland.as_str();

    Ok(Arc::new(move |object: &R| {
        match object.meta().controller_of() {
            Some(owner) if owner.api_version == api_version && owner.kind == kind => {
                vec![owner.owner_key().to_string()]
            }
            _ => Vec::new(),
        }
    }))
}

/// Selector for the resources controlled by the named Userland
pub fn owned_by(registry: &TypeRegistry, userland: &str) -> Result<ListSelector> {
    let owner = registry.owner_key(ResourceKind::Userland, userland)?;
    Ok(ListSelector::matching_field(OWNER_INDEX, owner.to_string()))
}

/// Register the indexes reconciliation and the driver depend on
pub async fn register_indexes<S: ObjectStore>(store: &S, registry: &TypeRegistry) -> Result<()> {
    register::<S, Workload>(store, OWNER_INDEX, owner_index_fn(registry)?).await?;
    register::<S, Service>(store, OWNER_INDEX, owner_index_fn(registry)?).await?;
    register::<S, StorageClaim>(store, OWNER_INDEX, owner_index_fn(registry)?).await?;

    let by_template: IndexFn<Userland> =
        Arc::new(|userland: &Userland| vec![userland.spec.template_name.clone()]);
    register::<S, Userland>(store, TEMPLATE_INDEX, by_template).await?;

    tracing::debug!("Registered ownership and template indexes");
    Ok(())
}

async fn register<S: ObjectStore, R: Resource>(
    store: &S,
    index: &str,
    key_fn: IndexFn<R>,
) -> Result<()> {
    store.register_index(index, key_fn).await.map_err(|e| {
        ReconcileError::from_store(StoreOp::RegisterIndex, R::KIND, &ObjectKey::new("", index), e)
    })
}

/// Assert `owner` as the controlling owner of `object`
///
/// Fails with `OwnershipConflict` when another owner already controls it.
pub fn set_controller_reference<R: Resource>(object: &mut R, owner: &OwnerReference) -> Result<()> {
    if let Some(current) = object.meta().controller_of() {
        if !current.same_owner(owner) {
            return Err(ReconcileError::OwnershipConflict {
                kind: R::KIND,
                key: object.key(),
                owner_kind: current.kind.clone(),
                owner: current.name.clone(),
            });
        }
    }

    let references = &mut object.meta_mut().owner_references;
    match references.iter_mut().find(|r| r.same_owner(owner)) {
        Some(existing) => *existing = owner.clone(),
        None => references.push(owner.clone()),
    }
    Ok(())
}
