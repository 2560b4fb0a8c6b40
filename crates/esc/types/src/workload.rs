//! Derived Workload: a replica-managed container group

use crate::meta::{LabelSelector, ObjectMeta};
use crate::pod::PodTemplateSpec;
use crate::resource::{Resource, ResourceKind};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Workload {
    pub metadata: ObjectMeta,
    pub spec: WorkloadSpec,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WorkloadSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,

    /// Immutable once the workload exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selector: Option<LabelSelector>,

    pub template: PodTemplateSpec,
}

impl Resource for Workload {
    const KIND: ResourceKind = ResourceKind::Workload;

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }

    fn immutable_violation(&self, previous: &Self) -> Option<&'static str> {
        if previous.spec.selector.is_some() && previous.spec.selector != self.spec.selector {
            return Some("spec.selector");
        }
        None
    }
}
