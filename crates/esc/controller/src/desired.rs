//! Desired-state resolution
//!
//! [`resolve`] reads the Userland and its Template; [`DesiredState::project`]
//! turns the pair into the derived resource set without touching the store.

use crate::error::{ReconcileError, Result, StoreOp};
use crate::naming::ResourceNames;
use esc_store::ObjectStore;
use esc_types::{
    ObjectKey, OwnerReference, PodTemplateSpec, Resource, ResourceKind, ServicePort,
    StorageClaimSpec, Template, TypeRegistry, Userland, Volume, VolumeMount,
};
use std::collections::BTreeMap;

/// One StorageClaim per Template volume
#[derive(Debug, Clone, PartialEq)]
pub struct DesiredClaim {
    pub key: ObjectKey,
    pub volume: String,
    pub spec: StorageClaimSpec,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DesiredWorkload {
    pub key: ObjectKey,
    pub labels: BTreeMap<String, String>,
    /// Template's pod template with the claim volumes appended and mounted
    pub template: PodTemplateSpec,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DesiredService {
    pub key: ObjectKey,
    pub labels: BTreeMap<String, String>,
    /// `None` leaves the ports of an existing service alone
    pub ports: Option<Vec<ServicePort>>,
}

/// Everything one pass should make true for a Userland
#[derive(Debug, Clone, PartialEq)]
pub struct DesiredState {
    pub userland: Userland,
    pub names: ResourceNames,
    /// Controller reference stamped on every derived resource
    pub owner: OwnerReference,
    pub claims: Vec<DesiredClaim>,
    pub workload: DesiredWorkload,
    pub service: DesiredService,
}

impl DesiredState {
    /// Project a Userland and its Template into the derived resource set
    pub fn project(userland: Userland, template: &Template, owner: OwnerReference) -> Self {
        let key = userland.key();
        let names = ResourceNames::new(&userland.spec.template_name, &key.name);
        let labels = names.labels();

        let claims: Vec<DesiredClaim> = template
            .spec
            .volumes
            .iter()
            .map(|volume| DesiredClaim {
                key: key.sibling(names.claim(&volume.name)),
                volume: volume.name.clone(),
                spec: volume.claim_spec.clone(),
            })
            .collect();

        let mut pod = template.spec.template.clone();
        for (volume, claim) in template.spec.volumes.iter().zip(&claims) {
            pod.spec
                .volumes
                .push(Volume::from_claim(volume.name.clone(), claim.key.name.clone()));

            let mount = &volume.volume_mount;
            if let Some(container) = pod.spec.container_mut(&mount.container_name) {
                if !container.volume_mounts.iter().any(|m| m.name == volume.name) {
                    container.volume_mounts.push(VolumeMount {
                        name: volume.name.clone(),
                        mount_path: mount.mount_path.clone(),
                        sub_path: mount.sub_path.clone(),
                        read_only: false,
                    });
                }
            }
        }

        let ports = template
            .spec
            .service
            .as_ref()
            .and_then(|service| service.ports.clone());

        Self {
            workload: DesiredWorkload {
                key: key.sibling(names.workload()),
                labels: labels.clone(),
                template: pod,
            },
            service: DesiredService {
                key: key.sibling(names.service()),
                labels,
                ports,
            },
            claims,
            names,
            owner,
            userland,
        }
    }
}

/// Outcome of resolving a Userland
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// The Userland no longer exists
    Gone,
    /// The referenced Template does not exist
    TemplateMissing(Userland),
    Desired(Box<DesiredState>),
}

/// Load the Userland at `key` and the Template it references
pub async fn resolve<S: ObjectStore>(
    store: &S,
    registry: &TypeRegistry,
    key: &ObjectKey,
) -> Result<Resolution> {
    let userland: Option<Userland> = store
        .find(key)
        .await
        .map_err(|e| ReconcileError::from_store(StoreOp::Get, ResourceKind::Userland, key, e))?;
    let Some(userland) = userland else {
        return Ok(Resolution::Gone);
    };

    let template_key = key.sibling(userland.spec.template_name.clone());
    let template: Option<Template> = store.find(&template_key).await.map_err(|e| {
        ReconcileError::from_store(StoreOp::Get, ResourceKind::Template, &template_key, e)
    })?;
    let Some(template) = template else {
        return Ok(Resolution::TemplateMissing(userland));
    };

    let owner = registry.controller_reference(&userland)?;
    Ok(Resolution::Desired(Box::new(DesiredState::project(
        userland, &template, owner,
    ))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use esc_types::{
        Container, ServiceSpec, TemplateSpec, TemplateVolumeMount, Uid, VolumeSource, VolumeSpec,
    };

    fn sample_template() -> Template {
        let mut template = Template::default();
        template.metadata.name = "t1".to_string();
        template.metadata.namespace = "ns".to_string();
        template.spec = TemplateSpec {
            template: PodTemplateSpec {
                spec: esc_types::PodSpec {
                    containers: vec![
                        Container {
                            name: "ide".to_string(),
                            image: "code-server:4".to_string(),
                            ..Default::default()
                        },
                        Container {
                            name: "sidecar".to_string(),
                            image: "busybox".to_string(),
                            ..Default::default()
                        },
                    ],
                    ..Default::default()
                },
                ..Default::default()
            },
            service: Some(ServiceSpec {
                ports: Some(vec![ServicePort {
                    port: 8080,
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            volumes: vec![VolumeSpec {
                name: "home".to_string(),
                volume_mount: TemplateVolumeMount {
                    container_name: "ide".to_string(),
                    mount_path: "/home/coder".to_string(),
                    sub_path: None,
                },
                claim_spec: StorageClaimSpec {
                    access_modes: vec!["ReadWriteOnce".to_string()],
                    ..Default::default()
                },
            }],
        };
        template
    }

    fn sample_userland() -> Userland {
        let mut userland = Userland::empty(&ObjectKey::new("ns", "u1"));
        userland.metadata.uid = Some(Uid::generate());
        userland.spec.template_name = "t1".to_string();
        userland
    }

    fn project() -> DesiredState {
        let userland = sample_userland();
        let owner = TypeRegistry::standard()
            .controller_reference(&userland)
            .unwrap();
        DesiredState::project(userland, &sample_template(), owner)
    }

    #[test]
    fn test_projection_names() {
        let desired = project();
        assert_eq!(desired.workload.key, ObjectKey::new("ns", "t1-u1"));
        assert_eq!(desired.service.key, ObjectKey::new("ns", "t1-u1-svc"));
        assert_eq!(desired.claims.len(), 1);
        assert_eq!(desired.claims[0].key, ObjectKey::new("ns", "t1-u1-pvc-home"));
        assert_eq!(desired.owner.name, "u1");
    }

    #[test]
    fn test_claim_volume_appended_and_mounted() {
        let desired = project();
        let pod = &desired.workload.template.spec;

        assert_eq!(pod.volumes.len(), 1);
        assert_eq!(pod.volumes[0].name, "home");
        assert_eq!(
            pod.volumes[0].source,
            VolumeSource::PersistentVolumeClaim {
                claim_name: "t1-u1-pvc-home".to_string(),
                read_only: false,
            }
        );

        let ide = &pod.containers[0];
        assert_eq!(ide.volume_mounts.len(), 1);
        assert_eq!(ide.volume_mounts[0].mount_path, "/home/coder");
        assert!(pod.containers[1].volume_mounts.is_empty());
    }

    #[test]
    fn test_existing_mount_is_not_duplicated() {
        let mut template = sample_template();
        template.spec.template.spec.containers[0]
            .volume_mounts
            .push(VolumeMount {
                name: "home".to_string(),
                mount_path: "/custom".to_string(),
                ..Default::default()
            });
        let userland = sample_userland();
        let owner = TypeRegistry::standard()
            .controller_reference(&userland)
            .unwrap();

        let desired = DesiredState::project(userland, &template, owner);
        let mounts = &desired.workload.template.spec.containers[0].volume_mounts;
        assert_eq!(mounts.len(), 1);
        assert_eq!(mounts[0].mount_path, "/custom");
    }

    #[test]
    fn test_service_ports_absent_without_service_spec() {
        let mut template = sample_template();
        template.spec.service = None;
        let userland = sample_userland();
        let owner = TypeRegistry::standard()
            .controller_reference(&userland)
            .unwrap();

        let desired = DesiredState::project(userland, &template, owner);
        assert!(desired.service.ports.is_none());
    }
}
