//! Risk classification and evaluation result types.

use serde::{Deserialize, Serialize};

/// Probability at or above which risk is moderate.
pub const MODERATE_THRESHOLD: f64 = 0.35;

/// Probability at or above which risk is high.
pub const HIGH_THRESHOLD: f64 = 0.65;

/// Risk level classification for heart disease.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    /// Low risk of heart disease
    Low,
    /// Moderate risk, monitoring recommended
    Moderate,
    /// High risk, intervention recommended
    High,
}

impl RiskLevel {
    /// Classify a probability: `< 0.35` low, `[0.35, 0.65)` moderate, `>= 0.65` high.
    #[must_use]
    pub fn from_probability(probability: f64) -> Self {
        if probability >= HIGH_THRESHOLD {
            Self::High
        } else if probability >= MODERATE_THRESHOLD {
            Self::Moderate
        } else {
            Self::Low
        }
    }

    /// Short label used in history listings.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "Low Risk",
            Self::Moderate => "Moderate Risk",
            Self::High => "High Risk",
        }
    }

    /// Headline for the result card.
    #[must_use]
    pub fn title(&self) -> &'static str {
        match self {
            Self::Low => "LOW RISK",
            Self::Moderate => "MODERATE RISK",
            Self::High => "HIGH RISK DETECTED",
        }
    }

    /// Symbol shown next to the result card title.
    #[must_use]
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Low => "✅",
            Self::Moderate => "⚠️",
            Self::High => "🚨",
        }
    }

    /// Symbol shown on the full-screen transition.
    #[must_use]
    pub fn overlay_symbol(&self) -> &'static str {
        match self {
            Self::Low => "💚",
            Self::Moderate => "⚠️",
            Self::High => "🚨",
        }
    }

    /// Style tag for the result card.
    #[must_use]
    pub fn style_tag(&self) -> &'static str {
        match self {
            Self::Low => "risk-card-low",
            Self::Moderate => "risk-card-moderate",
            Self::High => "risk-card-high",
        }
    }

    /// Get the associated color for TUI display (RGB).
    #[must_use]
    pub fn color(&self) -> (u8, u8, u8) {
        match self {
            Self::Low => (16, 185, 129),      // Emerald (#10B981)
            Self::Moderate => (251, 191, 36), // Amber (#FBBF24)
            Self::High => (244, 63, 94),      // Rose (#F43F5E)
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Moderate => write!(f, "moderate"),
            Self::High => write!(f, "high"),
        }
    }
}

/// Where a narrative text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NarrativeOrigin {
    /// Generated by the remote text service
    Remote,
    /// Built from the local rule template
    Template,
}

impl std::fmt::Display for NarrativeOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Remote => write!(f, "remote"),
            Self::Template => write!(f, "template"),
        }
    }
}

/// Three-part explanatory text (risk analysis, key factors, recommendation).
///
/// Markup is limited to `<p>`, `<strong>` and `<br>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Narrative {
    pub text: String,
    pub origin: NarrativeOrigin,
}

/// Outcome of one evaluation. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    /// Probability in [0.01, 0.99]
    pub probability: f64,

    /// Risk classification of `probability`
    pub risk_level: RiskLevel,

    /// Explanatory text
    pub narrative: Narrative,
}

impl EvaluationResult {
    /// Probability as a percentage with one decimal, e.g. `"72.4"`.
    #[must_use]
    pub fn percentage(&self) -> String {
        format_percentage(self.probability)
    }
}

/// Format a probability as a percentage with one decimal.
#[must_use]
pub fn format_percentage(probability: f64) -> String {
    format!("{:.1}", probability * 100.0)
}
