//! Saved evaluation entries.

use serde::{Deserialize, Serialize};

use super::{ClinicalRecord, RiskLevel};

/// One evaluation committed to history. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Unique identifier (epoch milliseconds at creation, kept strictly increasing)
    pub id: i64,

    /// When the entry was saved
    pub created_at: chrono::DateTime<chrono::Utc>,

    /// Scored probability
    pub probability: f64,

    /// Risk classification at scoring time
    pub risk_level: RiskLevel,

    /// The record that was scored
    pub record: ClinicalRecord,
}

impl HistoryEntry {
    /// Probability as a percentage with one decimal.
    #[must_use]
    pub fn percentage(&self) -> String {
        super::format_percentage(self.probability)
    }
}
