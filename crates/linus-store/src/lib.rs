//! Linus Store: JSON persistence of grid state with debounced saves.

pub mod json;
pub mod types;

pub use json::PersistentStore;
pub use types::*;
