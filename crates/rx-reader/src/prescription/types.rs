//! Prescription data types

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One medicine line extracted from a prescription
///
/// Every field is a plain string. The model sometimes emits `null`, numbers,
/// or omits a key entirely; all of those become strings (empty when absent).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicineEntry {
    /// Generic name, lowercase
    #[serde(default, deserialize_with = "lenient_string")]
    pub medicine: String,
    /// Amount per dose ("500mg", "1 tablet")
    #[serde(default, deserialize_with = "lenient_string")]
    pub dosage: String,
    /// Times per day ("twice daily")
    #[serde(default, deserialize_with = "lenient_string")]
    pub frequency: String,
    /// Treatment period ("5 days")
    #[serde(default, deserialize_with = "lenient_string")]
    pub duration: String,
}

impl MedicineEntry {
    pub fn new(
        medicine: impl Into<String>,
        dosage: impl Into<String>,
        frequency: impl Into<String>,
        duration: impl Into<String>,
    ) -> Self {
        Self {
            medicine: medicine.into(),
            dosage: dosage.into(),
            frequency: frequency.into(),
            duration: duration.into(),
        }
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    })
}

/// Output of the OCR + parse pipeline for one file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrescriptionAnalysis {
    /// Raw OCR text
    pub ocr_text: String,
    /// Parsed medicines (empty when the model output was unusable)
    pub medicines: Vec<MedicineEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lenient_fields() {
        let entry: MedicineEntry = serde_json::from_str(
            r#"{"medicine": " paracetamol ", "dosage": null, "frequency": 2}"#,
        )
        .unwrap();

        assert_eq!(entry.medicine, "paracetamol");
        assert_eq!(entry.dosage, "");
        assert_eq!(entry.frequency, "2");
        assert_eq!(entry.duration, "");
    }
}
