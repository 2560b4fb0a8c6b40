//! Control-loop driver
//!
//! Turns store watch events into Userland keys, feeds them through the
//! [`WorkQueue`] and runs the reconciler on a bounded set of workers.
//! A periodic resync re-enqueues every Userland.

use crate::error::{ReconcileError, Result, StoreOp};
use crate::ownership::TEMPLATE_INDEX;
use crate::queue::{BackoffPolicy, WorkQueue};
use crate::reconciler::Reconcile;
use esc_store::{ListSelector, ObjectStore, WatchEvent};
use esc_types::{ObjectKey, ResourceKind, TypeRegistry, Userland};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinSet;

/// Driver configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Userlands reconciled in parallel
    pub max_concurrent_reconciles: usize,
    /// Interval at which every Userland is re-enqueued
    pub resync_period: Duration,
    pub backoff: BackoffPolicy,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_reconciles: 1,
            resync_period: Duration::from_secs(600),
            backoff: BackoffPolicy::default(),
        }
    }
}

/// Reconcile counters
#[derive(Debug, Default)]
pub struct ControllerStats {
    reconciles: AtomicU64,
    failures: AtomicU64,
    requeues: AtomicU64,
    resyncs: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub reconciles: u64,
    pub failures: u64,
    pub requeues: u64,
    pub resyncs: u64,
}

impl ControllerStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            reconciles: self.reconciles.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            requeues: self.requeues.load(Ordering::Relaxed),
            resyncs: self.resyncs.load(Ordering::Relaxed),
        }
    }
}

pub struct Controller<S, R> {
    store: Arc<S>,
    reconciler: Arc<R>,
    registry: Arc<TypeRegistry>,
    queue: Arc<WorkQueue>,
    config: ControllerConfig,
    stats: Arc<ControllerStats>,
}

impl<S, R> Controller<S, R>
where
    S: ObjectStore + 'static,
    R: Reconcile,
{
    pub fn new(
        store: Arc<S>,
        reconciler: Arc<R>,
        registry: Arc<TypeRegistry>,
        config: ControllerConfig,
    ) -> Self {
        let queue = WorkQueue::new(config.backoff);
        Self {
            store,
            reconciler,
            registry,
            queue,
            config,
            stats: Arc::new(ControllerStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<ControllerStats> {
        Arc::clone(&self.stats)
    }

    pub fn queue(&self) -> Arc<WorkQueue> {
        Arc::clone(&self.queue)
    }

    /// Userland keys affected by a store change
    pub async fn map_event(&self, event: &WatchEvent) -> Result<Vec<ObjectKey>> {
        match event.kind {
            ResourceKind::Userland => Ok(vec![event.key.clone()]),
            ResourceKind::Template => {
                let selector =
                    ListSelector::matching_field(TEMPLATE_INDEX, event.key.name.clone());
                let userlands: Vec<Userland> = self
                    .store
                    .list(Some(&event.key.namespace), &selector)
                    .await
                    .map_err(|e| {
                        ReconcileError::from_store(
                            StoreOp::List,
                            ResourceKind::Userland,
                            &event.key,
                            e,
                        )
                    })?;
                Ok(userlands.iter().map(|u| u.metadata.key()).collect())
            }
            ResourceKind::Workload | ResourceKind::Service | ResourceKind::StorageClaim => {
                let api_version = self.registry.api_version(ResourceKind::Userland)?;
                Ok(event
                    .owners
                    .iter()
                    .filter(|o| o.is_controller())
                    .filter(|o| {
                        o.api_version == api_version && o.kind == ResourceKind::Userland.as_str()
                    })
                    .map(|o| event.key.sibling(o.name.clone()))
                    .collect())
            }
        }
    }

    /// Enqueue every Userland
    pub async fn resync(&self) -> Result<usize> {
        let userlands: Vec<Userland> = self
            .store
            .list(None, &ListSelector::All)
            .await
            .map_err(|e| {
                ReconcileError::from_store(
                    StoreOp::List,
                    ResourceKind::Userland,
                    &ObjectKey::default(),
                    e,
                )
            })?;

        for userland in &userlands {
            self.queue.add(userland.metadata.key()).await;
        }
        self.stats.resyncs.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(count = userlands.len(), "Resynced userlands");
        Ok(userlands.len())
    }

    /// Run until `shutdown` turns true or the watch stream closes
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut events = self.store.watch();

        if let Err(e) = self.resync().await {
            tracing::error!(error = %e, "Initial resync failed");
        }

        let mut workers = JoinSet::new();
        for worker in 0..self.config.max_concurrent_reconciles.max(1) {
            let controller = Arc::clone(&self);
            workers.spawn(async move { controller.work(worker).await });
        }

        tracing::info!(
            workers = self.config.max_concurrent_reconciles.max(1),
            resync_secs = self.config.resync_period.as_secs(),
            "Userland controller started"
        );

        let period = self.config.resync_period.max(Duration::from_secs(1));
        let mut resync = tokio::time::interval(period);
        // The first tick fires immediately; the initial resync already ran.
        resync.tick().await;

        loop {
            tokio::select! {
                received = events.recv() => match received {
                    Ok(event) => self.handle_event(&event).await,
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::warn!(missed = missed, "Watch stream lagged, resyncing");
                        if let Err(e) = self.resync().await {
                            tracing::error!(error = %e, "Resync failed");
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::info!("Watch stream closed");
                        break;
                    }
                },
                _ = resync.tick() => {
                    if let Err(e) = self.resync().await {
                        tracing::error!(error = %e, "Periodic resync failed");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        self.queue.shutdown().await;
        while workers.join_next().await.is_some() {}
        tracing::info!("Userland controller stopped");
    }

    async fn handle_event(&self, event: &WatchEvent) {
        match self.map_event(event).await {
            Ok(keys) => {
                for key in keys {
                    tracing::trace!(
                        kind = %event.kind,
                        object = %event.key,
                        userland = %key,
                        "Enqueue userland"
                    );
                    self.queue.add(key).await;
                }
            }
            Err(e) => {
                tracing::warn!(
                    kind = %event.kind,
                    object = %event.key,
                    error = %e,
                    "Failed to map watch event"
                );
            }
        }
    }

    async fn work(&self, worker: usize) {
        while let Some(key) = self.queue.get().await {
            self.process(&key).await;
            self.queue.done(&key).await;
        }
        tracing::debug!(worker = worker, "Worker stopped");
    }

    /// Run one pass for `key` and schedule what comes next
    pub async fn process(&self, key: &ObjectKey) {
        self.stats.reconciles.fetch_add(1, Ordering::Relaxed);

        match self.reconciler.reconcile(key).await {
            Ok(action) => {
                self.queue.forget(key).await;
                if let Some(after) = action.requeue_after {
                    self.stats.requeues.fetch_add(1, Ordering::Relaxed);
                    self.queue.add_after(key.clone(), after);
                }
            }
            Err(e) => {
                self.stats.failures.fetch_add(1, Ordering::Relaxed);
                let delay = self.queue.add_rate_limited(key.clone()).await;
                if e.requires_intervention() {
                    tracing::error!(
                        userland = %key,
                        error = %e,
                        "Reconciliation failed; needs intervention"
                    );
                } else {
                    tracing::warn!(
                        userland = %key,
                        error = %e,
                        retry_in_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "Reconciliation failed; will retry"
                    );
                }
            }
        }
    }
}
