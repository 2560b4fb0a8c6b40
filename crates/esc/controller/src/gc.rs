//! Garbage collection of stale derived resources
//!
//! Runs before the converger. Owned Workloads and Services whose name differs
//! from what the current binding produces are deleted, so a rebinding removes
//! the old template's resources before the new ones exist. Storage claims are
//! never deleted here: a stale claim is reported and kept, and only goes away
//! with its Userland through cascading deletion.

use crate::desired::DesiredState;
use crate::error::{ReconcileError, Result, StoreOp};
use crate::events::EventRecorder;
use crate::ownership::owned_by;
use esc_store::{ListSelector, ObjectStore, StoreError};
use esc_types::{EscEvent, Resource, Service, StorageClaim, TypeRegistry, Workload};
use std::collections::BTreeSet;

/// What a collection run did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GcReport {
    /// Names of deleted workloads and services
    pub deleted: Vec<String>,
    /// Names of stale claims that were kept
    pub retained: Vec<String>,
}

pub async fn collect_garbage<S: ObjectStore>(
    store: &S,
    registry: &TypeRegistry,
    recorder: &EventRecorder,
    desired: &DesiredState,
) -> Result<GcReport> {
    let selector = owned_by(registry, &desired.userland.metadata.name)?;
    let mut report = GcReport::default();

    let workload_name = desired.names.workload().to_string();
    for workload in list_owned::<S, Workload>(store, desired, &selector).await? {
        if workload.metadata.name != workload_name {
            delete_stale(store, recorder, desired, &workload).await?;
            report.deleted.push(workload.metadata.name);
        }
    }

    let service_name = desired.names.service();
    for service in list_owned::<S, Service>(store, desired, &selector).await? {
        if service.metadata.name != service_name {
            delete_stale(store, recorder, desired, &service).await?;
            report.deleted.push(service.metadata.name);
        }
    }

    let claim_names: BTreeSet<&str> = desired
        .claims
        .iter()
        .map(|c| c.key.name.as_str())
        .collect();
    for claim in list_owned::<S, StorageClaim>(store, desired, &selector).await? {
        if !claim_names.contains(claim.metadata.name.as_str()) {
            tracing::info!(claim = %claim.metadata.name, "Retaining stale storage claim");
            recorder.normal(
                &desired.userland,
                EscEvent::ClaimRetained {
                    name: claim.metadata.name.clone(),
                },
            );
            report.retained.push(claim.metadata.name);
        }
    }

    Ok(report)
}

async fn list_owned<S: ObjectStore, R: Resource>(
    store: &S,
    desired: &DesiredState,
    selector: &ListSelector,
) -> Result<Vec<R>> {
    let key = desired.userland.key();
    store
        .list(Some(&key.namespace), selector)
        .await
        .map_err(|e| ReconcileError::from_store(StoreOp::List, R::KIND, &key, e))
}

async fn delete_stale<S: ObjectStore, R: Resource>(
    store: &S,
    recorder: &EventRecorder,
    desired: &DesiredState,
    object: &R,
) -> Result<()> {
    let key = object.key();
    match store.delete::<R>(&key).await {
        Ok(()) => {}
        // Already gone
        Err(StoreError::NotFound { .. }) => return Ok(()),
        Err(e) => return Err(ReconcileError::from_store(StoreOp::Delete, R::KIND, &key, e)),
    }

    tracing::info!(kind = %R::KIND, name = %key.name, "Deleted stale derived resource");
    recorder.normal(
        &desired.userland,
        EscEvent::ResourceDeleted {
            kind: R::KIND,
            name: key.name,
        },
    );
    Ok(())
}
