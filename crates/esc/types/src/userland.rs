//! Userland: a named binding of a Template to a running instance

use crate::meta::ObjectMeta;
use crate::resource::{Resource, ResourceKind};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Userland {
    pub metadata: ObjectMeta,
    pub spec: UserlandSpec,
    pub status: UserlandStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserlandSpec {
    /// Display name; not used for naming derived resources
    #[serde(rename = "Name", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// Template in the same namespace
    pub template_name: String,

    /// Whether the workload should be materialised. Parsed and carried but
    /// not consulted by reconciliation yet.
    pub enabled: bool,
}

impl Default for UserlandSpec {
    fn default() -> Self {
        Self {
            display_name: None,
            template_name: String::new(),
            enabled: true,
        }
    }
}

/// Observed state; reserved
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserlandStatus {}

impl Resource for Userland {
    const KIND: ResourceKind = ResourceKind::Userland;

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enabled_defaults_to_true() {
        let spec: UserlandSpec =
            serde_json::from_value(serde_json::json!({ "templateName": "jupyter" })).unwrap();
        assert!(spec.enabled);
        assert_eq!(spec.template_name, "jupyter");
    }

    #[test]
    fn test_display_name_wire_name() {
        let spec: UserlandSpec = serde_json::from_value(serde_json::json!({
            "Name": "Alice's notebook",
            "templateName": "jupyter",
            "enabled": false
        }))
        .unwrap();
        assert_eq!(spec.display_name.as_deref(), Some("Alice's notebook"));
        assert!(!spec.enabled);
    }
}
