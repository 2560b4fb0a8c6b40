//! Derived StorageClaim: a request for persistent storage

use crate::meta::ObjectMeta;
use crate::resource::{Resource, ResourceKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StorageClaim {
    pub metadata: ObjectMeta,
    pub spec: StorageClaimSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StorageClaimSpec {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub access_modes: Vec<String>,

    pub resources: StorageRequest,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_class_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_mode: Option<String>,

    /// Binding to a concrete volume, set by the platform
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_name: Option<String>,
}

/// Requested capacity, e.g. `storage: "10Gi"`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StorageRequest {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub requests: BTreeMap<String, String>,
}

impl Resource for StorageClaim {
    const KIND: ResourceKind = ResourceKind::StorageClaim;

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }

    fn immutable_violation(&self, previous: &Self) -> Option<&'static str> {
        if previous.spec.volume_name.is_some() && previous.spec.volume_name != self.spec.volume_name {
            return Some("spec.volumeName");
        }
        None
    }
}
