//! Domain layer: Core business types and logic.
//!
//! This module contains pure Rust types with no I/O.
//! All types are serializable and implement strict validation.

mod history;
mod record;
mod risk;
pub mod scorer;

pub use history::HistoryEntry;
pub use record::{format_number, ClinicalRecord, FIELD_NAMES};
pub use risk::{format_percentage, EvaluationResult, Narrative, NarrativeOrigin, RiskLevel};

#[cfg(test)]
pub(crate) use record::tests as record_tests;
