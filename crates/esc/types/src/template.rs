//! Template: a reusable, read-only workload blueprint

use crate::meta::ObjectMeta;
use crate::pod::PodTemplateSpec;
use crate::resource::{Resource, ResourceKind};
use crate::service::ServiceSpec;
use crate::storage::StorageClaimSpec;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Template {
    pub metadata: ObjectMeta,
    pub spec: TemplateSpec,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TemplateSpec {
    /// Pod template copied into every derived Workload
    pub template: PodTemplateSpec,

    /// Network exposure; only the ports are used
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<ServiceSpec>,

    /// Volumes, each materialised as one StorageClaim
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<VolumeSpec>,
}

/// A named volume of a Template
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VolumeSpec {
    /// Unique within the Template
    pub name: String,

    pub volume_mount: TemplateVolumeMount,

    #[serde(rename = "pvcSpec")]
    pub claim_spec: StorageClaimSpec,
}

/// Where a Template volume is mounted
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TemplateVolumeMount {
    /// Name of the container in the pod template that receives the mount
    pub container_name: String,
    pub mount_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_path: Option<String>,
}

impl Resource for Template {
    const KIND: ResourceKind = ResourceKind::Template;

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}
