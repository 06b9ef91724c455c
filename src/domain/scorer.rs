//! Fixed-weight risk scorer.
//!
//! A hand-tuned logistic heuristic over the 13 Cleveland features. The
//! coefficients point in the dataset's known risk directions; nothing here is
//! trained or persisted.

use rand::Rng;

use super::ClinicalRecord;

/// Coefficient table.
pub mod weights {
    pub const AGE: f64 = 0.015;
    pub const SEX: f64 = 0.25;
    /// Entered inverted: `(3 - cp) * |CP|`
    pub const CP: f64 = -0.20;
    pub const TRESTBPS: f64 = 0.006;
    pub const CHOL: f64 = 0.002;
    pub const FBS: f64 = 0.12;
    /// Entered by magnitude: `restecg * |RESTECG|`
    pub const RESTECG: f64 = -0.08;
    /// Entered inverted: `(220 - thalach) * |THALACH|`
    pub const THALACH: f64 = -0.008;
    pub const EXANG: f64 = 0.25;
    pub const OLDPEAK: f64 = 0.18;
    /// Entered inverted: `(2 - slope) * |SLOPE|`
    pub const SLOPE: f64 = -0.12;
    pub const CA: f64 = 0.30;
    /// Applied to the remapped thalassemia multiplier
    pub const THAL: f64 = 0.18;
}

/// Subtracted from the weighted sum before the sigmoid.
pub const INTERCEPT: f64 = 4.5;

/// Half-width of the uniform noise added to the probability.
pub const PERTURBATION: f64 = 0.02;

/// Lowest probability ever reported.
pub const MIN_PROBABILITY: f64 = 0.01;

/// Highest probability ever reported.
pub const MAX_PROBABILITY: f64 = 0.99;

/// Thalassemia code to weight multiplier: 7 → 3, 6 → 2, anything else → 0.
#[must_use]
pub fn thal_multiplier(thal: f64) -> f64 {
    if thal == 7.0 {
        3.0
    } else if thal == 6.0 {
        2.0
    } else {
        0.0
    }
}

/// Weighted sum minus the intercept (the sigmoid's input).
#[must_use]
pub fn linear_score(record: &ClinicalRecord) -> f64 {
    let mut score = 0.0;

    score += record.age * weights::AGE;
    score += record.sex * weights::SEX;
    score += (3.0 - record.cp) * weights::CP.abs();
    score += record.trestbps * weights::TRESTBPS;
    score += record.chol * weights::CHOL;
    score += record.fbs * weights::FBS;
    score += record.restecg * weights::RESTECG.abs();
    score += (220.0 - record.thalach) * weights::THALACH.abs();
    score += record.exang * weights::EXANG;
    score += record.oldpeak * weights::OLDPEAK;
    score += (2.0 - record.slope) * weights::SLOPE.abs();
    score += record.ca * weights::CA;
    score += thal_multiplier(record.thal) * weights::THAL;

    score - INTERCEPT
}

/// Logistic function.
#[must_use]
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Probability before noise and clamping, in (0, 1).
#[must_use]
pub fn base_probability(record: &ClinicalRecord) -> f64 {
    sigmoid(linear_score(record))
}

/// Score a record using the thread-local RNG for the perturbation.
///
/// The record must already be complete; no validation happens here.
#[must_use]
pub fn score(record: &ClinicalRecord) -> f64 {
    score_with_rng(record, &mut rand::thread_rng())
}

/// Score a record with an explicit RNG. Output is always in [0.01, 0.99].
#[must_use]
pub fn score_with_rng<R: Rng + ?Sized>(record: &ClinicalRecord, rng: &mut R) -> f64 {
    let variation = rng.gen_range(-PERTURBATION..PERTURBATION);
    clamp_probability(base_probability(record) + variation)
}

fn clamp_probability(p: f64) -> f64 {
    if p.is_nan() {
        return MIN_PROBABILITY;
    }
    p.clamp(MIN_PROBABILITY, MAX_PROBABILITY)
}
