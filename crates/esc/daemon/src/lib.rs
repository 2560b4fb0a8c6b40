//! ESC Daemon library
//!
//! Hosts the Userland controller next to an in-memory object store:
//! - REST API for Templates, Userlands and the resources derived from them
//! - The reconciliation driver, fed by store watch events and periodic resync
//! - A bounded event log and live event stream
//! - Server lifecycle management

pub mod api;
pub mod config;
pub mod error;
pub mod event_log;
pub mod server;

pub use config::DaemonConfig;
pub use error::{ApiError, DaemonError};
pub use event_log::EventLog;
pub use server::Server;
