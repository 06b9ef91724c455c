//! Adapters layer: Concrete implementations of ports.
//!
//! These modules contain the actual integration with external libraries:
//! - `gemini`: remote narrative generation over HTTP (reqwest)
//! - `template`: deterministic local narrative
//! - `sqlite`: SQLite-backed key-value storage
//! - `sanitize`: secret filtering for logs

pub mod gemini;
pub mod sanitize;
pub mod sqlite;
pub mod template;

// Re-export storage error for lib.rs
pub use sqlite::StorageError;
