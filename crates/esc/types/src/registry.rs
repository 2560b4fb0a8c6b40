//! Explicit type registry
//!
//! Maps every [`ResourceKind`] to the API version it is served under. One
//! registry is built at startup and handed to the components that need to
//! stamp owner references or compute ownership index keys.

use crate::meta::{ObjectMeta, OwnerKey, OwnerReference};
use crate::resource::{Resource, ResourceKind};
use std::collections::BTreeMap;
use thiserror::Error;

/// API group and version of Templates and Userlands
pub const ESC_API_VERSION: &str = "esc.k06.in/v1alpha2";

/// Registry errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("kind {0} is not registered")]
    Unregistered(ResourceKind),

    #[error("kind {kind} already registered as {api_version}")]
    AlreadyRegistered {
        kind: ResourceKind,
        api_version: String,
    },

    #[error("{kind} {name} has no uid yet")]
    MissingUid { kind: ResourceKind, name: String },
}

#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    api_versions: BTreeMap<ResourceKind, String>,
}

impl TypeRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every kind the controller works with
    pub fn standard() -> Self {
        let mut api_versions = BTreeMap::new();
        api_versions.insert(ResourceKind::Template, ESC_API_VERSION.to_string());
        api_versions.insert(ResourceKind::Userland, ESC_API_VERSION.to_string());
        api_versions.insert(ResourceKind::Workload, "apps/v1".to_string());
        api_versions.insert(ResourceKind::Service, "v1".to_string());
        api_versions.insert(ResourceKind::StorageClaim, "v1".to_string());
        Self { api_versions }
    }

    pub fn register(
        &mut self,
        kind: ResourceKind,
        api_version: impl Into<String>,
    ) -> Result<(), RegistryError> {
        if let Some(existing) = self.api_versions.get(&kind) {
            return Err(RegistryError::AlreadyRegistered {
                kind,
                api_version: existing.clone(),
            });
        }
        self.api_versions.insert(kind, api_version.into());
        Ok(())
    }

    pub fn is_registered(&self, kind: ResourceKind) -> bool {
        self.api_versions.contains_key(&kind)
    }

    pub fn api_version(&self, kind: ResourceKind) -> Result<&str, RegistryError> {
        self.api_versions
            .get(&kind)
            .map(String::as_str)
            .ok_or(RegistryError::Unregistered(kind))
    }

    /// Controller reference pointing at `owner`
    pub fn controller_reference<R: Resource>(
        &self,
        owner: &R,
    ) -> Result<OwnerReference, RegistryError> {
        let meta: &ObjectMeta = owner.meta();
        let uid = meta.uid.ok_or_else(|| RegistryError::MissingUid {
            kind: R::KIND,
            name: meta.name.clone(),
        })?;

        Ok(OwnerReference {
            api_version: self.api_version(R::KIND)?.to_string(),
            kind: R::KIND.as_str().to_string(),
            name: meta.name.clone(),
            uid,
            controller: Some(true),
            block_owner_deletion: Some(true),
        })
    }

    /// Ownership index key under which objects owned by `name` are found
    pub fn owner_key(&self, kind: ResourceKind, name: &str) -> Result<OwnerKey, RegistryError> {
        Ok(OwnerKey {
            api_version: self.api_version(kind)?.to_string(),
            kind: kind.as_str().to_string(),
            name: name.to_string(),
        })
    }
}
