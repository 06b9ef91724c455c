//! Narrative port: Trait for explanatory-text sources.
//!
//! Two implementations exist: a remote text-generation service and a local
//! rule template. Both produce the same three-part formatted text.

use crate::domain::{ClinicalRecord, NarrativeOrigin, RiskLevel};

/// Errors a narrative source can report.
///
/// These never reach the user: the provider falls back to the template.
#[derive(Debug, Clone, thiserror::Error)]
pub enum NarrativeError {
    #[error("Narrative request failed: {0}")]
    Transport(String),

    #[error("Narrative service returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed narrative response: {0}")]
    MalformedResponse(String),
}

/// Input to a narrative source.
#[derive(Debug, Clone, Copy)]
pub struct NarrativeRequest<'a> {
    pub record: &'a ClinicalRecord,
    pub probability: f64,
    pub risk_level: RiskLevel,
}

impl NarrativeRequest<'_> {
    /// Probability as a percentage with one decimal.
    #[must_use]
    pub fn percentage(&self) -> String {
        crate::domain::format_percentage(self.probability)
    }
}

/// Trait for narrative generation.
pub trait NarrativeSource: Send + Sync {
    /// Which kind of source this is.
    fn origin(&self) -> NarrativeOrigin;

    /// Produce the formatted narrative text.
    ///
    /// # Errors
    /// Returns `NarrativeError` on transport failure, non-success status or
    /// an unusable response body.
    fn generate(&self, request: &NarrativeRequest<'_>) -> Result<String, NarrativeError>;
}
