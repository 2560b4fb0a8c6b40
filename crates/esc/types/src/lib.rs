//! ESC Types - Schema types for the Userland controller
//!
//! A **Template** is a reusable, read-only workload blueprint. A **Userland**
//! binds a Template to a running instance. The controller continuously derives
//! three kinds of runtime resources from each (Userland, Template) pair:
//!
//! - **Workload**: a replica-managed container group
//! - **StorageClaim**: one per Template volume
//! - **Service**: a cluster-internal network endpoint
//!
//! Every derived resource carries an owner reference back to its Userland.
//!
//! ## Type Registry
//!
//! API versions are resolved through an explicit [`TypeRegistry`] value built at
//! startup rather than a process-wide scheme.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod events;
pub mod ids;
pub mod meta;
pub mod pod;
pub mod registry;
pub mod resource;
pub mod service;
pub mod storage;
pub mod template;
pub mod userland;
pub mod workload;

// Re-export main types
pub use events::{EscEvent, EventEnvelope, EventSeverity, ObjectReference};
pub use ids::{ObjectKey, Uid};
pub use meta::{LabelSelector, ObjectMeta, OwnerKey, OwnerReference};
pub use pod::{
    Container, ContainerPort, EnvVar, PodSpec, PodTemplateMeta, PodTemplateSpec,
    ResourceRequirements, Volume, VolumeMount, VolumeSource,
};
pub use registry::{RegistryError, TypeRegistry, ESC_API_VERSION};
pub use resource::{Resource, ResourceKind};
pub use service::{Service, ServicePort, ServiceSpec, ServiceType};
pub use storage::{StorageClaim, StorageClaimSpec, StorageRequest};
pub use template::{Template, TemplateSpec, TemplateVolumeMount, VolumeSpec};
pub use userland::{Userland, UserlandSpec, UserlandStatus};
pub use workload::{Workload, WorkloadSpec};
