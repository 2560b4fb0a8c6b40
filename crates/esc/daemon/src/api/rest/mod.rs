//! REST facade over the object store
//!
//! Stands in for the platform API server: Templates and Userlands are
//! written here, derived resources and events are read back.

pub mod handlers;
pub mod router;
pub mod state;

pub use router::create_router;
pub use state::AppState;
