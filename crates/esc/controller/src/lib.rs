//! ESC Controller - Userland reconciliation
//!
//! A Userland binds a Template to a running instance. Each reconciliation pass
//! turns the pair into derived resources and keeps them converged:
//!
//! 1. [`desired`] resolves the Userland and its Template and projects them
//!    into the desired resource set (one Workload, one Service, a
//!    StorageClaim per Template volume).
//! 2. [`gc`] deletes owned resources that the current binding no longer
//!    produces, before anything new is created.
//! 3. [`converge`] applies the desired set with create-or-update, preserving
//!    fields the platform owns.
//!
//! [`controller::Controller`] drives passes from store watch events through a
//! deduplicating work queue with per-key backoff.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod controller;
pub mod converge;
pub mod desired;
pub mod error;
pub mod events;
pub mod gc;
pub mod naming;
pub mod ownership;
pub mod queue;
pub mod reconciler;

// Re-exports
pub use controller::{Controller, ControllerConfig, ControllerStats, StatsSnapshot};
pub use converge::{converge, ConvergeReport};
pub use desired::{
    resolve, DesiredClaim, DesiredService, DesiredState, DesiredWorkload, Resolution,
};
pub use error::{ReconcileError, Result, StoreOp};
pub use events::EventRecorder;
pub use gc::{collect_garbage, GcReport};
pub use naming::ResourceNames;
pub use ownership::{register_indexes, set_controller_reference, OWNER_INDEX, TEMPLATE_INDEX};
pub use queue::{BackoffPolicy, WorkQueue};
pub use reconciler::{Action, Reconcile, UserlandReconciler};
