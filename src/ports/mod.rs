//! Ports layer: Trait definitions for external collaborators.
//!
//! Following Hexagonal Architecture, these traits define the boundaries
//! between the application and external systems (text generation, storage).

mod narrative;
mod storage;

pub use narrative::{NarrativeError, NarrativeRequest, NarrativeSource};
pub use storage::KeyValueStore;
