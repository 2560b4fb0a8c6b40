//! API request handlers

mod events;
mod health;
mod objects;
mod resources;
mod system;
mod templates;
mod userlands;

pub use events::*;
pub use health::*;
pub use objects::{AppliedObject, DeleteResponse};
pub use resources::*;
pub use system::*;
pub use templates::*;
pub use userlands::*;
