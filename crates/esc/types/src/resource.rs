//! The `Resource` trait implemented by every stored object type

use crate::ids::ObjectKey;
use crate::meta::ObjectMeta;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kinds of objects known to the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceKind {
    Template,
    Userland,
    Workload,
    Service,
    StorageClaim,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 5] = [
        ResourceKind::Template,
        ResourceKind::Userland,
        ResourceKind::Workload,
        ResourceKind::Service,
        ResourceKind::StorageClaim,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Template => "Template",
            ResourceKind::Userland => "Userland",
            ResourceKind::Workload => "Workload",
            ResourceKind::Service => "Service",
            ResourceKind::StorageClaim => "StorageClaim",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed object that can be persisted in the object store.
///
/// The admission hooks describe what the platform does to objects on its own:
/// filling system-assigned fields on creation and rejecting updates that touch
/// fields which are immutable once set.
pub trait Resource:
    Clone + PartialEq + fmt::Debug + Default + Serialize + DeserializeOwned + Send + Sync + 'static
{
    const KIND: ResourceKind;

    fn meta(&self) -> &ObjectMeta;

    fn meta_mut(&mut self) -> &mut ObjectMeta;

    fn key(&self) -> ObjectKey {
        self.meta().key()
    }

    /// An empty object carrying only its identity
    fn empty(key: &ObjectKey) -> Self {
        let mut object = Self::default();
        *object.meta_mut() = ObjectMeta::named(key);
        object
    }

    /// Fill system-assigned fields on creation
    fn admit_create(&mut self, _serial: u64) {}

    /// Name of an immutable field changed relative to `previous`, if any
    fn immutable_violation(&self, _previous: &Self) -> Option<&'static str> {
        None
    }
}
