//! End-to-end reconciliation passes against the in-memory store

use async_trait::async_trait;
use esc_controller::{EventRecorder, ReconcileError, Reconcile, UserlandReconciler};
use esc_store::{
    IndexFn, InMemoryStore, ListSelector, ObjectStore, StoreError, WatchEvent,
};
use esc_types::{
    Container, EscEvent, ObjectKey, PodSpec, PodTemplateSpec, Resource, ResourceKind, Service,
    ServicePort, ServiceSpec, StorageClaim, StorageClaimSpec, Template, TemplateSpec,
    TemplateVolumeMount, TypeRegistry, Uid, Userland, VolumeSpec, Workload,
};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

const NS: &str = "dev";

struct Harness<S = InMemoryStore> {
    store: Arc<S>,
    reconciler: UserlandReconciler<S>,
}

impl Harness {
    async fn new() -> Self {
        Self::with_store(InMemoryStore::new()).await
    }
}

impl<S: ObjectStore + 'static> Harness<S> {
    async fn with_store(store: S) -> Self {
        let store = Arc::new(store);
        let reconciler = UserlandReconciler::new(
            Arc::clone(&store),
            Arc::new(TypeRegistry::standard()),
            EventRecorder::new("userland-controller"),
        );
        reconciler.setup().await.unwrap();
        Self { store, reconciler }
    }

    async fn reconcile(&self, name: &str) -> Result<(), ReconcileError> {
        self.reconciler
            .reconcile(&ObjectKey::new(NS, name))
            .await
            .map(|_| ())
    }

    async fn names<R: Resource>(&self) -> Vec<String> {
        let objects: Vec<R> = self.store.list(Some(NS), &ListSelector::All).await.unwrap();
        let mut names: Vec<String> = objects.into_iter().map(|o| o.meta().name.clone()).collect();
        names.sort();
        names
    }
}

/// What the platform does to the next update of one kind
#[derive(Debug, Clone, Copy)]
enum Interference {
    /// Refuse the write as a change to an immutable field
    Reject(ResourceKind, &'static str),
    /// Write the object first, so the caller's version is stale
    WriteFirst(ResourceKind),
}

impl Interference {
    fn kind(&self) -> ResourceKind {
        match *self {
            Interference::Reject(kind, _) | Interference::WriteFirst(kind) => kind,
        }
    }
}

/// In-memory store that lets a test interfere with one update
#[derive(Default)]
struct InterferingStore {
    inner: InMemoryStore,
    next: Mutex<Option<Interference>>,
}

impl InterferingStore {
    fn interfere(&self, interference: Interference) {
        *self.next.lock().unwrap() = Some(interference);
    }

    fn take_for(&self, kind: ResourceKind) -> Option<Interference> {
        let mut next = self.next.lock().unwrap();
        if next.map(|i| i.kind()) == Some(kind) {
            next.take()
        } else {
            None
        }
    }
}

#[async_trait]
impl ObjectStore for InterferingStore {
    async fn get<R: Resource>(&self, key: &ObjectKey) -> esc_store::Result<R> {
        self.inner.get(key).await
    }

    async fn list<R: Resource>(
        &self,
        namespace: Option<&str>,
        selector: &ListSelector,
    ) -> esc_store::Result<Vec<R>> {
        self.inner.list(namespace, selector).await
    }

    async fn create<R: Resource>(&self, object: R) -> esc_store::Result<R> {
        self.inner.create(object).await
    }

    async fn update<R: Resource>(&self, object: R) -> esc_store::Result<R> {
        match self.take_for(R::KIND) {
            Some(Interference::Reject(kind, field)) => {
                return Err(StoreError::Invalid {
                    kind,
                    key: object.key(),
                    field,
                });
            }
            Some(Interference::WriteFirst(_)) => {
                let mut current: R = self.inner.get(&object.key()).await?;
                current
                    .meta_mut()
                    .annotations
                    .insert("platform/touched".to_string(), "true".to_string());
                self.inner.update(current).await?;
            }
            None => {}
        }
        self.inner.update(object).await
    }

    async fn delete<R: Resource>(&self, key: &ObjectKey) -> esc_store::Result<()> {
        self.inner.delete::<R>(key).await
    }

    async fn register_index<R: Resource>(
        &self,
        index: &str,
        key_fn: IndexFn<R>,
    ) -> esc_store::Result<()> {
        self.inner.register_index(index, key_fn).await
    }

    fn watch(&self) -> broadcast::Receiver<WatchEvent> {
        self.inner.watch()
    }
}

fn template(name: &str, volumes: &[&str]) -> Template {
    let mut template = Template::empty(&ObjectKey::new(NS, name));
    template.spec = TemplateSpec {
        template: PodTemplateSpec {
            spec: PodSpec {
                containers: vec![Container {
                    name: "shell".to_string(),
                    image: format!("{}:latest", name),
                    ..Default::default()
                }],
                ..Default::default()
            },
            ..Default::default()
        },
        service: Some(ServiceSpec {
            ports: Some(vec![ServicePort {
                name: Some("ssh".to_string()),
                port: 22,
                ..Default::default()
            }]),
            ..Default::default()
        }),
        volumes: volumes
            .iter()
            .map(|v| VolumeSpec {
                name: v.to_string(),
                volume_mount: TemplateVolumeMount {
                    container_name: "shell".to_string(),
                    mount_path: format!("/mnt/{}", v),
                    sub_path: None,
                },
                claim_spec: StorageClaimSpec {
                    access_modes: vec!["ReadWriteOnce".to_string()],
                    ..Default::default()
                },
            })
            .collect(),
    };
    template
}

fn userland(name: &str, template: &str) -> Userland {
    let mut userland = Userland::empty(&ObjectKey::new(NS, name));
    userland.spec.template_name = template.to_string();
    userland
}

#[tokio::test]
async fn test_first_pass_creates_derived_resources() {
    let h = Harness::new().await;
    h.store.create(template("t1", &["data"])).await.unwrap();
    h.store.create(userland("u1", "t1")).await.unwrap();

    h.reconcile("u1").await.unwrap();

    assert_eq!(h.names::<Workload>().await, vec!["t1-u1"]);
    assert_eq!(h.names::<Service>().await, vec!["t1-u1-svc"]);
    assert_eq!(h.names::<StorageClaim>().await, vec!["t1-u1-pvc-data"]);

    let workload: Workload = h.store.get(&ObjectKey::new(NS, "t1-u1")).await.unwrap();
    assert_eq!(workload.spec.replicas, Some(1));
    let selector = workload.spec.selector.unwrap();
    assert_eq!(selector.match_labels["app"], "t1-u1");
    assert_eq!(selector.match_labels["controller"], "u1");
    assert_eq!(selector.match_labels["template"], "t1");
    assert_eq!(workload.spec.template.spec.volumes.len(), 1);
    assert_eq!(
        workload.spec.template.spec.containers[0].volume_mounts[0].mount_path,
        "/mnt/data"
    );

    let service: Service = h.store.get(&ObjectKey::new(NS, "t1-u1-svc")).await.unwrap();
    assert!(service.spec.cluster_ip.is_some());
    assert_eq!(service.spec.ports.unwrap()[0].port, 22);
}

#[tokio::test]
async fn test_second_pass_makes_no_mutations() {
    let h = Harness::new().await;
    h.store.create(template("t1", &["data", "cache"])).await.unwrap();
    h.store.create(userland("u1", "t1")).await.unwrap();

    h.reconcile("u1").await.unwrap();
    let version = h.store.current_version().await;

    h.reconcile("u1").await.unwrap();
    assert_eq!(h.store.current_version().await, version);
}

#[tokio::test]
async fn test_volume_binding_survives_reconcile() {
    let h = Harness::new().await;
    h.store.create(template("t1", &["data"])).await.unwrap();
    h.store.create(userland("u1", "t1")).await.unwrap();
    h.reconcile("u1").await.unwrap();

    let key = ObjectKey::new(NS, "t1-u1-pvc-data");
    let mut claim: StorageClaim = h.store.get(&key).await.unwrap();
    claim.spec.volume_name = Some("pv-123".to_string());
    h.store.update(claim).await.unwrap();

    h.reconcile("u1").await.unwrap();

    let claim: StorageClaim = h.store.get(&key).await.unwrap();
    assert_eq!(claim.spec.volume_name.as_deref(), Some("pv-123"));
}

#[tokio::test]
async fn test_rebind_replaces_workload_and_service() {
    let h = Harness::new().await;
    h.store.create(template("a", &["data"])).await.unwrap();
    h.store.create(template("b", &["data"])).await.unwrap();
    let created = h.store.create(userland("u1", "a")).await.unwrap();
    h.reconcile("u1").await.unwrap();

    let mut events = h.reconciler.recorder().subscribe();
    let mut rebound = created;
    rebound.spec.template_name = "b".to_string();
    h.store.update(rebound).await.unwrap();

    h.reconcile("u1").await.unwrap();

    assert_eq!(h.names::<Workload>().await, vec!["b-u1"]);
    assert_eq!(h.names::<Service>().await, vec!["b-u1-svc"]);
    // Claims are retained across rebinding
    assert_eq!(
        h.names::<StorageClaim>().await,
        vec!["a-u1-pvc-data", "b-u1-pvc-data"]
    );

    let mut reasons = Vec::new();
    while let Ok(envelope) = events.try_recv() {
        reasons.push(envelope.event);
    }
    assert!(reasons.contains(&EscEvent::ResourceDeleted {
        kind: ResourceKind::Workload,
        name: "a-u1".to_string(),
    }));
    assert!(reasons.contains(&EscEvent::ClaimRetained {
        name: "a-u1-pvc-data".to_string(),
    }));
}

#[tokio::test]
async fn test_missing_template_is_retryable_and_creates_nothing() {
    let h = Harness::new().await;
    h.store.create(userland("u1", "nope")).await.unwrap();
    let mut events = h.reconciler.recorder().subscribe();

    let err = h.reconcile("u1").await.unwrap_err();

    assert!(matches!(err, ReconcileError::TemplateNotFound { ref template, .. } if template == "nope"));
    assert!(err.is_retryable());
    assert!(h.names::<Workload>().await.is_empty());
    assert!(h.names::<Service>().await.is_empty());
    assert!(h.names::<StorageClaim>().await.is_empty());

    let envelope = events.try_recv().unwrap();
    assert_eq!(envelope.event.reason(), "TemplateNotFound");
}

#[tokio::test]
async fn test_missing_userland_is_clean_noop() {
    let h = Harness::new().await;
    h.reconcile("ghost").await.unwrap();
}

#[tokio::test]
async fn test_derived_resources_are_owned_by_userland() {
    let h = Harness::new().await;
    h.store.create(template("t1", &["data"])).await.unwrap();
    let owner = h.store.create(userland("u1", "t1")).await.unwrap();
    h.reconcile("u1").await.unwrap();

    let workload: Workload = h.store.get(&ObjectKey::new(NS, "t1-u1")).await.unwrap();
    let service: Service = h.store.get(&ObjectKey::new(NS, "t1-u1-svc")).await.unwrap();
    let claim: StorageClaim = h
        .store
        .get(&ObjectKey::new(NS, "t1-u1-pvc-data"))
        .await
        .unwrap();

    for meta in [&workload.metadata, &service.metadata, &claim.metadata] {
        let controller = meta.controller_of().unwrap();
        assert_eq!(controller.name, "u1");
        assert_eq!(controller.kind, "Userland");
        assert_eq!(Some(controller.uid), owner.metadata.uid);
    }
}

#[tokio::test]
async fn test_drift_is_corrected() {
    let h = Harness::new().await;
    h.store.create(template("t1", &[])).await.unwrap();
    h.store.create(userland("u1", "t1")).await.unwrap();
    h.reconcile("u1").await.unwrap();

    let key = ObjectKey::new(NS, "t1-u1");
    let mut workload: Workload = h.store.get(&key).await.unwrap();
    workload.spec.replicas = Some(5);
    workload.spec.template.spec.containers[0].image = "tampered".to_string();
    h.store.update(workload).await.unwrap();

    h.reconcile("u1").await.unwrap();

    let workload: Workload = h.store.get(&key).await.unwrap();
    assert_eq!(workload.spec.replicas, Some(1));
    assert_eq!(workload.spec.template.spec.containers[0].image, "t1:latest");
}

#[tokio::test]
async fn test_name_collision_with_foreign_owner_is_refused() {
    let h = Harness::new().await;
    // "a-b" + "c" and "a" + "b-c" both derive "a-b-c"
    h.store.create(template("a-b", &[])).await.unwrap();
    h.store.create(template("a", &[])).await.unwrap();
    h.store.create(userland("c", "a-b")).await.unwrap();
    h.store.create(userland("b-c", "a")).await.unwrap();

    h.reconcile("c").await.unwrap();
    let err = h.reconcile("b-c").await.unwrap_err();

    assert!(matches!(err, ReconcileError::OwnershipConflict { .. }));
    assert!(err.requires_intervention());
    let workload: Workload = h.store.get(&ObjectKey::new(NS, "a-b-c")).await.unwrap();
    assert_eq!(workload.metadata.controller_of().unwrap().name, "c");
}

#[tokio::test]
async fn test_deleting_userland_cascades_to_claims() {
    let h = Harness::new().await;
    h.store.create(template("t1", &["data"])).await.unwrap();
    h.store.create(userland("u1", "t1")).await.unwrap();
    h.reconcile("u1").await.unwrap();

    h.store
        .delete::<Userland>(&ObjectKey::new(NS, "u1"))
        .await
        .unwrap();

    assert!(h.names::<Workload>().await.is_empty());
    assert!(h.names::<Service>().await.is_empty());
    assert!(h.names::<StorageClaim>().await.is_empty());
    h.reconcile("u1").await.unwrap();
}

async fn bump_image<S: ObjectStore>(store: &S, template: &str, image: &str) {
    let mut template: Template = store.get(&ObjectKey::new(NS, template)).await.unwrap();
    template.spec.template.spec.containers[0].image = image.to_string();
    store.update(template).await.unwrap();
}

#[tokio::test]
async fn test_adopted_workload_keeps_its_selector() {
    let h = Harness::new().await;
    h.store.create(template("t1", &[])).await.unwrap();
    h.store.create(userland("u1", "t1")).await.unwrap();

    let mut legacy = Workload::empty(&ObjectKey::new(NS, "t1-u1"));
    legacy.spec.selector = Some(esc_types::LabelSelector {
        match_labels: [("app".to_string(), "legacy".to_string())].into(),
    });
    let legacy = h.store.create(legacy).await.unwrap();

    h.reconcile("u1").await.unwrap();

    let workload: Workload = h.store.get(&legacy.key()).await.unwrap();
    assert_eq!(workload.metadata.uid, legacy.metadata.uid);
    assert_eq!(workload.spec.selector, legacy.spec.selector);
    assert_eq!(workload.metadata.controller_of().unwrap().name, "u1");
}

#[tokio::test]
async fn test_rejected_selector_needs_intervention_and_is_not_recreated() {
    let h = Harness::with_store(InterferingStore::default()).await;
    h.store.create(template("t1", &[])).await.unwrap();
    h.store.create(userland("u1", "t1")).await.unwrap();
    h.reconcile("u1").await.unwrap();

    let key = ObjectKey::new(NS, "t1-u1");
    let before: Workload = h.store.get(&key).await.unwrap();

    bump_image(h.store.as_ref(), "t1", "t1:v2").await;
    h.store
        .interfere(Interference::Reject(ResourceKind::Workload, "spec.selector"));

    let err = h.reconcile("u1").await.unwrap_err();

    assert!(matches!(
        err,
        ReconcileError::ImmutableField {
            kind: ResourceKind::Workload,
            field: "spec.selector",
            ..
        }
    ));
    assert!(err.requires_intervention());
    assert!(!err.is_retryable());

    // Left in place for the operator: same object, old spec
    let after: Workload = h.store.get(&key).await.unwrap();
    assert_eq!(after.metadata.uid, before.metadata.uid);
    assert_eq!(after.metadata.resource_version, before.metadata.resource_version);
    assert_eq!(after.spec.template.spec.containers[0].image, "t1:latest");
}

#[tokio::test]
async fn test_failure_after_claims_reports_partial_apply() {
    let h = Harness::new().await;
    h.store.create(template("t1", &["data"])).await.unwrap();
    h.store.create(userland("u1", "t1")).await.unwrap();

    let mut other = Userland::empty(&ObjectKey::new(NS, "other"));
    other.metadata.uid = Some(Uid::generate());
    let foreign = TypeRegistry::standard()
        .controller_reference(&other)
        .unwrap();
    let mut squatter = Service::empty(&ObjectKey::new(NS, "t1-u1-svc"));
    squatter.metadata.owner_references.push(foreign);
    h.store.create(squatter).await.unwrap();

    let err = h.reconcile("u1").await.unwrap_err();

    let ReconcileError::PartialApply { applied, source } = &err else {
        panic!("expected a partial apply, got {err:?}");
    };
    assert_eq!(applied, &vec!["t1-u1-pvc-data".to_string(), "t1-u1".to_string()]);
    assert!(matches!(
        **source,
        ReconcileError::OwnershipConflict {
            kind: ResourceKind::Service,
            ..
        }
    ));
    assert!(err.requires_intervention());

    let claim_key = ObjectKey::new(NS, "t1-u1-pvc-data");
    let claim: StorageClaim = h.store.get(&claim_key).await.unwrap();

    h.store
        .delete::<Service>(&ObjectKey::new(NS, "t1-u1-svc"))
        .await
        .unwrap();
    h.reconcile("u1").await.unwrap();

    let service: Service = h.store.get(&ObjectKey::new(NS, "t1-u1-svc")).await.unwrap();
    assert_eq!(service.metadata.controller_of().unwrap().name, "u1");
    let reconverged: StorageClaim = h.store.get(&claim_key).await.unwrap();
    assert_eq!(reconverged.metadata.uid, claim.metadata.uid);
    assert_eq!(
        reconverged.metadata.resource_version,
        claim.metadata.resource_version
    );
}

#[tokio::test]
async fn test_concurrent_write_is_a_retryable_conflict() {
    let h = Harness::with_store(InterferingStore::default()).await;
    h.store.create(template("t1", &[])).await.unwrap();
    h.store.create(userland("u1", "t1")).await.unwrap();
    h.reconcile("u1").await.unwrap();

    bump_image(h.store.as_ref(), "t1", "t1:v2").await;
    h.store.interfere(Interference::WriteFirst(ResourceKind::Workload));

    let err = h.reconcile("u1").await.unwrap_err();

    assert!(matches!(
        err,
        ReconcileError::Conflict {
            kind: ResourceKind::Workload,
            ..
        }
    ));
    assert!(err.is_retryable());
    assert!(!err.requires_intervention());

    h.reconcile("u1").await.unwrap();
    let workload: Workload = h.store.get(&ObjectKey::new(NS, "t1-u1")).await.unwrap();
    assert_eq!(workload.spec.template.spec.containers[0].image, "t1:v2");
    assert_eq!(workload.metadata.annotations["platform/touched"], "true");
}
