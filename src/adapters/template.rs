//! Local template adapter: deterministic narrative built from rules.
//!
//! Used whenever the remote service is not configured or fails. The output has
//! the same three parts as a generated narrative: risk analysis, key factors
//! (at most three, in fixed priority order) and a recommendation.

use crate::domain::{format_number, ClinicalRecord, NarrativeOrigin, RiskLevel};
use crate::ports::{NarrativeError, NarrativeRequest, NarrativeSource};

/// Maximum number of factors cited.
pub const MAX_FACTORS: usize = 3;

/// Rule-based narrative source. Never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalTemplate;

impl LocalTemplate {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Build the narrative text.
    #[must_use]
    pub fn compose(&self, request: &NarrativeRequest<'_>) -> String {
        let pct = request.percentage();
        let mut text = String::new();
        text.push_str(&analysis(request.risk_level, &pct));
        text.push_str(&key_factors(request.record));
        text.push_str(&recommendation(request.risk_level));
        text
    }
}

impl NarrativeSource for LocalTemplate {
    fn origin(&self) -> NarrativeOrigin {
        NarrativeOrigin::Template
    }

    fn generate(&self, request: &NarrativeRequest<'_>) -> Result<String, NarrativeError> {
        Ok(self.compose(request))
    }
}

/// Every matching risk factor, highest priority first.
#[must_use]
pub fn matching_factors(record: &ClinicalRecord) -> Vec<String> {
    let mut factors = Vec::new();

    if record.ca >= 2.0 {
        factors.push(format!(
            "{} major vessels affected",
            format_number(record.ca)
        ));
    }
    if record.oldpeak >= 2.0 {
        factors.push(format!(
            "Severe ST depression ({} mm)",
            format_number(record.oldpeak)
        ));
    }
    if record.exang == 1.0 {
        factors.push("Exercise-induced angina (ischemia)".to_string());
    }
    if record.cp == 3.0 {
        factors.push("Typical anginal chest pain".to_string());
    }
    if record.thalach < 120.0 && record.age > 50.0 {
        factors.push("Low maximum heart rate for age".to_string());
    }
    if record.trestbps >= 140.0 {
        factors.push(format!(
            "Elevated blood pressure ({} mm Hg)",
            format_number(record.trestbps)
        ));
    }
    if record.chol >= 240.0 {
        factors.push(format!(
            "High cholesterol ({} mg/dl)",
            format_number(record.chol)
        ));
    }
    if record.age >= 60.0 {
        factors.push("Advanced age".to_string());
    }
    if record.fbs == 1.0 {
        factors.push("Elevated fasting blood sugar".to_string());
    }

    factors
}

fn analysis(level: RiskLevel, pct: &str) -> String {
    match level {
        RiskLevel::High => format!(
            "<p><strong>RISK ANALYSIS:</strong> The estimated risk of significant heart disease is {pct}%. This result indicates a strong need for prompt intervention.</p>"
        ),
        RiskLevel::Moderate => format!(
            "<p><strong>RISK ANALYSIS:</strong> There is a moderate risk of {pct}%. The parameters call for caution, monitoring and lifestyle changes.</p>"
        ),
        RiskLevel::Low => format!(
            "<p><strong>RISK ANALYSIS:</strong> The risk is low ({pct}%). Most clinical indicators are within healthy or acceptable ranges.</p>"
        ),
    }
}

fn key_factors(record: &ClinicalRecord) -> String {
    let factors = matching_factors(record);
    if factors.is_empty() {
        return "<p><strong>KEY FACTORS:</strong> No critical risk factors outside normal ranges were found in the data provided.</p>".to_string();
    }

    let cited: Vec<&str> = factors.iter().take(MAX_FACTORS).map(String::as_str).collect();
    format!(
        "<p><strong>KEY FACTORS:</strong> The main parameters driving this result are: {}.</p>",
        cited.join("; ")
    )
}

fn recommendation(level: RiskLevel) -> &'static str {
    match level {
        RiskLevel::High => "<p><strong>CLINICAL RECOMMENDATION:</strong> Seek an <strong>immediate</strong> consultation with a cardiologist. Advanced testing (e.g. angiography) is needed to confirm the diagnosis and plan treatment.</p>",
        RiskLevel::Moderate => "<p><strong>CLINICAL RECOMMENDATION:</strong> Schedule a complete check-up with your primary care physician in the coming weeks. Start strict changes to diet and exercise.</p>",
        RiskLevel::Low => "<p><strong>CLINICAL RECOMMENDATION:</strong> Keep up a healthy lifestyle. Have a preventive cardiology screening at least once a year.</p>",
    }
}
