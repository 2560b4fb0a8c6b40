//! The Userland reconciler
//!
//! One pass: resolve the desired state, collect garbage, converge, update
//! status. Passes keep no state between runs; everything is re-read from the
//! store, so passes for different Userlands can run concurrently.

use crate::converge::converge;
use crate::desired::{resolve, Resolution};
use crate::error::{ReconcileError, Result};
use crate::events::EventRecorder;
use crate::gc::collect_garbage;
use crate::ownership::register_indexes;
use async_trait::async_trait;
use esc_store::ObjectStore;
use esc_types::{EscEvent, ObjectKey, TypeRegistry};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// What the driver should do after a successful pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Action {
    pub requeue_after: Option<Duration>,
}

impl Action {
    /// Nothing further until the next change
    pub fn done() -> Self {
        Self::default()
    }

    pub fn requeue(after: Duration) -> Self {
        Self {
            requeue_after: Some(after),
        }
    }
}

/// A reconciliation entry point the driver can run
#[async_trait]
pub trait Reconcile: Send + Sync + 'static {
    async fn reconcile(&self, key: &ObjectKey) -> Result<Action>;
}

/// Reconciles Userlands against an object store
pub struct UserlandReconciler<S> {
    store: Arc<S>,
    registry: Arc<TypeRegistry>,
    recorder: EventRecorder,
}

impl<S: ObjectStore + 'static> UserlandReconciler<S> {
    pub fn new(store: Arc<S>, registry: Arc<TypeRegistry>, recorder: EventRecorder) -> Self {
        Self {
            store,
            registry,
            recorder,
        }
    }

    /// Register the field indexes passes depend on; run once at startup
    pub async fn setup(&self) -> Result<()> {
        register_indexes(self.store.as_ref(), &self.registry).await
    }

    pub fn recorder(&self) -> &EventRecorder {
        &self.recorder
    }

    #[instrument(skip_all, fields(userland = %key))]
    async fn run_pass(&self, key: &ObjectKey) -> Result<Action> {
        let store = self.store.as_ref();

        let desired = match resolve(store, &self.registry, key).await? {
            Resolution::Desired(desired) => desired,
            Resolution::Gone => {
                tracing::info!("Userland not found, nothing to do");
                return Ok(Action::done());
            }
            Resolution::TemplateMissing(userland) => {
                let template = userland.spec.template_name.clone();
                tracing::warn!(template = %template, "Referenced template not found");
                self.recorder.warning(
                    &userland,
                    EscEvent::TemplateNotFound {
                        template_name: template.clone(),
                    },
                );
                return Err(ReconcileError::TemplateNotFound {
                    userland: key.clone(),
                    template,
                });
            }
        };

        let gc = collect_garbage(store, &self.registry, &self.recorder, &desired).await?;
        let applied = converge(store, &desired).await?;

        // Status is reserved; nothing observed to write back yet.

        tracing::debug!(
            deleted = gc.deleted.len(),
            retained = gc.retained.len(),
            mutations = applied.mutations(),
            "Reconciled userland"
        );
        Ok(Action::done())
    }
}

#[async_trait]
impl<S: ObjectStore + 'static> Reconcile for UserlandReconciler<S> {
    async fn reconcile(&self, key: &ObjectKey) -> Result<Action> {
        self.run_pass(key).await
    }
}
