//! ESC Store - The object store the controller reconciles against
//!
//! The controller core only talks to the [`ObjectStore`] trait:
//!
//! - `get` / `list` (optionally through a registered field index)
//! - `create` / `update` with optimistic concurrency on the resource version
//! - `delete` with cascading removal of owned objects
//! - `watch` for change notifications
//!
//! [`InMemoryStore`] implements the trait for development, the daemon and
//! tests. It also plays the platform's part: it assigns uids, versions and
//! cluster addresses, and rejects changes to immutable fields.
//!
//! [`create_or_update`] is the fetch-or-create-then-patch helper used by the
//! converger. It takes a pure `patch(existing) -> desired` function.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod apply;
pub mod error;
pub mod memory;
pub mod traits;

// Re-exports
pub use apply::{create_or_update, OperationResult};
pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use traits::{IndexFn, ListSelector, ObjectStore, WatchAction, WatchEvent};
