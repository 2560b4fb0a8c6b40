//! Identifiers for stored objects
//!
//! Objects are addressed by namespace and name; the store additionally stamps
//! every object with a [`Uid`] that changes when an object is recreated.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Namespaced name of an object
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Key of a sibling object in the same namespace
    pub fn sibling(&self, name: impl Into<String>) -> Self {
        Self::new(self.namespace.clone(), name)
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Store-assigned unique identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Uid(Uuid);

impl Uid {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_key_display() {
        let key = ObjectKey::new("team-a", "alice");
        assert_eq!(key.to_string(), "team-a/alice");
    }

    #[test]
    fn test_sibling_keeps_namespace() {
        let key = ObjectKey::new("team-a", "alice");
        let sibling = key.sibling("notebook");
        assert_eq!(sibling, ObjectKey::new("team-a", "notebook"));
    }

    #[test]
    fn test_uid_generation() {
        assert_ne!(Uid::generate(), Uid::generate());
    }
}
