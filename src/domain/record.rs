//! Clinical record types for heart-disease risk estimation.
//!
//! Based on the 13 attributes of the UCI Cleveland heart-disease dataset.

use serde::{Deserialize, Serialize};

/// The 13 clinical measurements describing one patient.
///
/// Categorical fields carry the dataset's integer codes as `f64` so a record
/// can be filled straight from numeric form input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct ClinicalRecord {
    /// Age in years
    pub age: f64,

    /// Sex: 1 = male, 0 = female
    pub sex: f64,

    /// Chest-pain type: 0 asymptomatic, 1 atypical angina, 2 non-anginal, 3 typical angina
    pub cp: f64,

    /// Resting blood pressure in mm Hg
    pub trestbps: f64,

    /// Serum cholesterol in mg/dl
    pub chol: f64,

    /// Fasting blood sugar > 120 mg/dl: 1 = yes, 0 = no
    pub fbs: f64,

    /// Resting ECG: 0 normal, 1 ST-T abnormality, 2 left ventricular hypertrophy
    pub restecg: f64,

    /// Maximum heart rate achieved
    pub thalach: f64,

    /// Exercise-induced angina: 1 = yes, 0 = no
    pub exang: f64,

    /// ST depression induced by exercise relative to rest (mm)
    pub oldpeak: f64,

    /// Slope of the peak exercise ST segment: 0 down, 1 flat, 2 up
    pub slope: f64,

    /// Number of major vessels colored by fluoroscopy (0-4)
    pub ca: f64,

    /// Thalassemia: 3 normal, 6 fixed defect, 7 reversible defect
    pub thal: f64,
}

/// Field names in form and vector order.
pub const FIELD_NAMES: [&str; 13] = [
    "age", "sex", "cp", "trestbps", "chol", "fbs", "restecg", "thalach", "exang", "oldpeak",
    "slope", "ca", "thal",
];

/// Human-readable labels, same order as [`FIELD_NAMES`].
const FIELD_LABELS: [&str; 13] = [
    "Age",
    "Sex",
    "Chest Pain Type",
    "Resting Blood Pressure",
    "Cholesterol",
    "Fasting Blood Sugar > 120",
    "Resting ECG",
    "Max Heart Rate",
    "Exercise-Induced Angina",
    "ST Depression",
    "ST Slope",
    "Major Vessels",
    "Thalassemia",
];

impl ClinicalRecord {
    /// Convert to a vector in [`FIELD_NAMES`] order.
    #[must_use]
    pub fn to_vec(&self) -> Vec<f64> {
        vec![
            self.age,
            self.sex,
            self.cp,
            self.trestbps,
            self.chol,
            self.fbs,
            self.restecg,
            self.thalach,
            self.exang,
            self.oldpeak,
            self.slope,
            self.ca,
            self.thal,
        ]
    }

    /// Create a record from a vector in [`FIELD_NAMES`] order.
    ///
    /// # Errors
    /// Returns error if vector length is not 13.
    pub fn from_vec(v: &[f64]) -> Result<Self, String> {
        if v.len() != FIELD_NAMES.len() {
            return Err(format!(
                "Expected {} fields, got {}",
                FIELD_NAMES.len(),
                v.len()
            ));
        }

        Ok(Self {
            age: v[0],
            sex: v[1],
            cp: v[2],
            trestbps: v[3],
            chol: v[4],
            fbs: v[5],
            restecg: v[6],
            thalach: v[7],
            exang: v[8],
            oldpeak: v[9],
            slope: v[10],
            ca: v[11],
            thal: v[12],
        })
    }

    /// Whether every field holds a finite number.
    ///
    /// Scoring must never be attempted on an incomplete record.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.to_vec().iter().all(|v| v.is_finite())
    }

    /// Validate that all fields are within their clinical ranges and code sets.
    ///
    /// # Errors
    /// Returns validation errors as a vector of strings.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if !self.is_complete() {
            errors.push("All 13 fields must be numeric".to_string());
            return Err(errors);
        }

        check_range(&mut errors, "Age", self.age, 1.0, 120.0);
        check_codes(&mut errors, "Sex", self.sex, &[0.0, 1.0]);
        check_codes(&mut errors, "Chest pain type", self.cp, &[0.0, 1.0, 2.0, 3.0]);
        check_range(&mut errors, "Resting BP", self.trestbps, 50.0, 250.0);
        check_range(&mut errors, "Cholesterol", self.chol, 100.0, 600.0);
        check_codes(&mut errors, "Fasting blood sugar", self.fbs, &[0.0, 1.0]);
        check_codes(&mut errors, "Resting ECG", self.restecg, &[0.0, 1.0, 2.0]);
        check_range(&mut errors, "Max heart rate", self.thalach, 60.0, 220.0);
        check_codes(&mut errors, "Exercise angina", self.exang, &[0.0, 1.0]);
        check_range(&mut errors, "ST depression", self.oldpeak, 0.0, 10.0);
        check_codes(&mut errors, "ST slope", self.slope, &[0.0, 1.0, 2.0]);
        check_codes(&mut errors, "Major vessels", self.ca, &[0.0, 1.0, 2.0, 3.0, 4.0]);
        check_codes(&mut errors, "Thalassemia", self.thal, &[3.0, 6.0, 7.0]);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Sex as display text.
    #[must_use]
    pub fn sex_label(&self) -> String {
        code_label(self.sex, &[(0, "Female"), (1, "Male")])
    }

    /// Chest-pain type as display text.
    #[must_use]
    pub fn chest_pain_label(&self) -> String {
        code_label(
            self.cp,
            &[
                (0, "Asymptomatic"),
                (1, "Atypical angina"),
                (2, "Non-anginal pain"),
                (3, "Typical angina"),
            ],
        )
    }

    /// Resting ECG category as display text.
    #[must_use]
    pub fn ecg_label(&self) -> String {
        code_label(
            self.restecg,
            &[
                (0, "Normal"),
                (1, "ST-T wave abnormality"),
                (2, "Left ventricular hypertrophy"),
            ],
        )
    }

    /// ST slope category as display text.
    #[must_use]
    pub fn slope_label(&self) -> String {
        code_label(
            self.slope,
            &[(0, "Downsloping"), (1, "Flat"), (2, "Upsloping")],
        )
    }

    /// Thalassemia category as display text.
    #[must_use]
    pub fn thal_label(&self) -> String {
        code_label(
            self.thal,
            &[(3, "Normal"), (6, "Fixed defect"), (7, "Reversible defect")],
        )
    }

    /// Every field under its human-readable label, coded fields translated.
    #[must_use]
    pub fn describe(&self) -> Vec<(&'static str, String)> {
        let values = [
            format_number(self.age),
            self.sex_label(),
            self.chest_pain_label(),
            format!("{} mm Hg", format_number(self.trestbps)),
            format!("{} mg/dl", format_number(self.chol)),
            yes_no(self.fbs),
            self.ecg_label(),
            format!("{} bpm", format_number(self.thalach)),
            yes_no(self.exang),
            format!("{} mm", format_number(self.oldpeak)),
            self.slope_label(),
            format_number(self.ca),
            self.thal_label(),
        ];

        FIELD_LABELS.iter().copied().zip(values).collect()
    }
}

fn check_range(errors: &mut Vec<String>, name: &str, value: f64, min: f64, max: f64) {
    if !(min..=max).contains(&value) {
        errors.push(format!("{name} {value} out of range [{min}, {max}]"));
    }
}

fn check_codes(errors: &mut Vec<String>, name: &str, value: f64, codes: &[f64]) {
    if !codes.contains(&value) {
        let allowed: Vec<String> = codes.iter().map(|c| format_number(*c)).collect();
        errors.push(format!("{name} {value} must be one of {}", allowed.join("/")));
    }
}

fn code_label(value: f64, table: &[(i64, &str)]) -> String {
    if value.fract() == 0.0 {
        let code = value as i64;
        if let Some((_, label)) = table.iter().find(|(c, _)| *c == code) {
            return (*label).to_string();
        }
    }
    format_number(value)
}

fn yes_no(flag: f64) -> String {
    if flag == 1.0 { "Yes" } else { "No" }.to_string()
}

/// Render a number without a trailing `.0` for whole values.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_record() -> ClinicalRecord {
        ClinicalRecord {
            age: 63.0,
            sex: 1.0,
            cp: 3.0,
            trestbps: 145.0,
            chol: 233.0,
            fbs: 1.0,
            restecg: 0.0,
            thalach: 150.0,
            exang: 0.0,
            oldpeak: 2.3,
            slope: 0.0,
            ca: 0.0,
            thal: 6.0,
        }
    }

    #[test]
    fn test_record_vec_roundtrip() {
        let record = sample_record();
        let v = record.to_vec();
        assert_eq!(v.len(), 13);
        let back = ClinicalRecord::from_vec(&v).expect("Should parse");
        assert_eq!(back, record);
    }

    #[test]
    fn test_from_vec_rejects_wrong_length() {
        assert!(ClinicalRecord::from_vec(&[1.0; 9]).is_err());
    }

    #[test]
    fn test_incomplete_record() {
        let mut record = sample_record();
        assert!(record.is_complete());
        record.chol = f64::NAN;
        assert!(!record.is_complete());
        assert!(record.validate().is_err());
    }

    #[test]
    fn test_validation() {
        assert!(sample_record().validate().is_ok());

        let invalid = ClinicalRecord {
            cp: 5.0,
            thal: 4.0,
            ..sample_record()
        };
        let errors = invalid.validate().expect_err("Should reject codes");
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_coded_labels() {
        let record = sample_record();
        assert_eq!(record.sex_label(), "Male");
        assert_eq!(record.chest_pain_label(), "Typical angina");
        assert_eq!(record.ecg_label(), "Normal");
        assert_eq!(record.slope_label(), "Downsloping");
        assert_eq!(record.thal_label(), "Fixed defect");

        let unknown = ClinicalRecord {
            thal: 5.0,
            ..record
        };
        assert_eq!(unknown.thal_label(), "5");
    }

    #[test]
    fn test_describe_lists_every_field() {
        let lines = sample_record().describe();
        assert_eq!(lines.len(), 13);
        assert_eq!(lines[0], ("Age", "63".to_string()));
        assert_eq!(lines[5], ("Fasting Blood Sugar > 120", "Yes".to_string()));
        assert_eq!(lines[8], ("Exercise-Induced Angina", "No".to_string()));
        assert_eq!(lines[9], ("ST Depression", "2.3 mm".to_string()));
    }
}
