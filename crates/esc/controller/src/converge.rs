//! Converger: apply the desired resource set
//!
//! The `patch_*` functions are pure: they take the existing object (or an
//! empty one carrying only the name) and return the object as it should be
//! stored. Field policy:
//!
//! - platform-owned fields (claim volume binding, service cluster IP) are
//!   kept from the existing object
//! - selectors and pod labels are only set when absent, since selectors are
//!   immutable once created
//! - everything else is overwritten from the desired state
//! - the controller reference to the Userland is asserted every time

use crate::desired::{DesiredClaim, DesiredService, DesiredState, DesiredWorkload};
use crate::error::{ReconcileError, Result, StoreOp};
use crate::ownership::set_controller_reference;
use esc_store::{create_or_update, ObjectStore, OperationResult, StoreError};
use esc_types::{
    LabelSelector, ObjectKey, OwnerReference, Resource, ResourceKind, Service, ServiceType,
    StorageClaim, Workload,
};

/// Replicas of every derived workload
pub const WORKLOAD_REPLICAS: i32 = 1;

pub fn patch_claim(
    mut claim: StorageClaim,
    desired: &DesiredClaim,
    owner: &OwnerReference,
) -> Result<StorageClaim> {
    let mut spec = desired.spec.clone();
    if claim.spec.volume_name.is_some() {
        spec.volume_name = claim.spec.volume_name.take();
    }
    claim.spec = spec;

    set_controller_reference(&mut claim, owner)?;
    Ok(claim)
}

pub fn patch_workload(
    mut workload: Workload,
    desired: &DesiredWorkload,
    owner: &OwnerReference,
) -> Result<Workload> {
    workload.spec.replicas = Some(WORKLOAD_REPLICAS);

    if workload.spec.selector.is_none() {
        workload.spec.selector = Some(LabelSelector {
            match_labels: desired.labels.clone(),
        });
    }

    let pod = &mut workload.spec.template;
    if pod.metadata.labels.is_empty() {
        pod.metadata.labels = desired.labels.clone();
    }
    pod.metadata.annotations = desired.template.metadata.annotations.clone();
    pod.spec = desired.template.spec.clone();

    set_controller_reference(&mut workload, owner)?;
    Ok(workload)
}

pub fn patch_service(
    mut service: Service,
    desired: &DesiredService,
    owner: &OwnerReference,
) -> Result<Service> {
    if let Some(ports) = &desired.ports {
        service.spec.ports = Some(ports.clone());
    }

    if service.spec.selector.is_none() {
        service.spec.selector = Some(desired.labels.clone());
    }

    service.spec.service_type = Some(ServiceType::ClusterIP);

    set_controller_reference(&mut service, owner)?;
    Ok(service)
}

/// One applied derived resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedResource {
    pub kind: ResourceKind,
    pub name: String,
    pub result: OperationResult,
}

/// Outcome of a converge step
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConvergeReport {
    pub applied: Vec<AppliedResource>,
}

impl ConvergeReport {
    /// Number of store writes the step made
    pub fn mutations(&self) -> usize {
        self.applied
            .iter()
            .filter(|a| a.result != OperationResult::Unchanged)
            .count()
    }

    fn record(&mut self, kind: ResourceKind, key: &ObjectKey, result: OperationResult) {
        self.applied.push(AppliedResource {
            kind,
            name: key.name.clone(),
            result,
        });
    }

    /// Wrap a failure with what was already applied in this pass
    fn partial(&self, err: ReconcileError) -> ReconcileError {
        if self.applied.is_empty() {
            return err;
        }
        ReconcileError::PartialApply {
            applied: self.applied.iter().map(|a| a.name.clone()).collect(),
            source: Box::new(err),
        }
    }
}

/// Apply claims, then the workload, then the service
///
/// The first failure stops the step. Resources applied before it stay as
/// they are; the next pass converges them again.
pub async fn converge<S: ObjectStore>(store: &S, desired: &DesiredState) -> Result<ConvergeReport> {
    let mut report = ConvergeReport::default();
    let owner = &desired.owner;

    for claim in &desired.claims {
        let result = apply(store, &claim.key, |existing| patch_claim(existing, claim, owner))
            .await
            .map_err(|e| report.partial(e))?;
        report.record(ResourceKind::StorageClaim, &claim.key, result);
    }

    let workload = &desired.workload;
    let result = apply(store, &workload.key, |existing| {
        patch_workload(existing, workload, owner)
    })
    .await
    .map_err(|e| report.partial(e))?;
    report.record(ResourceKind::Workload, &workload.key, result);

    let service = &desired.service;
    let result = apply(store, &service.key, |existing| {
        patch_service(existing, service, owner)
    })
    .await
    .map_err(|e| report.partial(e))?;
    report.record(ResourceKind::Service, &service.key, result);

    Ok(report)
}

enum ApplyError {
    Store(StoreError),
    Patch(ReconcileError),
}

impl From<StoreError> for ApplyError {
    fn from(err: StoreError) -> Self {
        ApplyError::Store(err)
    }
}

async fn apply<S, R, F>(store: &S, key: &ObjectKey, patch: F) -> Result<OperationResult>
where
    S: ObjectStore,
    R: Resource,
    F: FnOnce(R) -> Result<R>,
{
    let (_, result) = create_or_update::<S, R, ApplyError, _>(store, key, |existing| {
        patch(existing).map_err(ApplyError::Patch)
    })
    .await
    .map_err(|e| match e {
        ApplyError::Store(e) => ReconcileError::from_store(StoreOp::Apply, R::KIND, key, e),
        ApplyError::Patch(e) => e,
    })?;

    match result {
        OperationResult::Unchanged => {
            tracing::debug!(kind = %R::KIND, name = %key.name, "Derived resource up to date")
        }
        _ => tracing::info!(
            kind = %R::KIND,
            name = %key.name,
            operation = %result,
            "Applied derived resource"
        ),
    }
    Ok(result)
}
