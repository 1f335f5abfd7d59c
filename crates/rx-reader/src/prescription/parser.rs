//! LLM-backed prescription parser

use regex::Regex;
use serde_json::Value;
use std::sync::{Arc, OnceLock};

use crate::config::LlmConfig;
use crate::error::{Error, Result};
use crate::generation::PromptBuilder;
use crate::providers::{CompletionOptions, LlmProvider};

use super::types::MedicineEntry;

fn json_array_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?s)\[.*\]").expect("Invalid regex"))
}

/// Pull the outermost JSON array (first `[` to last `]`) out of model output
pub fn extract_json_array(text: &str) -> Result<Vec<Value>> {
    let found = json_array_pattern()
        .find(text)
        .ok_or_else(|| Error::parse("No JSON array found in LLM response"))?;

    serde_json::from_str(found.as_str())
        .map_err(|e| Error::parse(format!("Invalid JSON array in LLM response: {}", e)))
}

/// Turns OCR text into medicine entries with one completion call
pub struct PrescriptionParser {
    llm: Arc<dyn LlmProvider>,
    options: CompletionOptions,
}

impl PrescriptionParser {
    pub fn new(llm: Arc<dyn LlmProvider>, config: &LlmConfig) -> Self {
        Self {
            llm,
            options: CompletionOptions::new(config.temperature, config.parse_max_tokens),
        }
    }

    /// Parse OCR text into medicine entries
    ///
    /// Entries without a medicine name are dropped; objects that do not fit
    /// the entry shape are skipped with a warning.
    pub async fn parse(&self, ocr_text: &str) -> Result<Vec<MedicineEntry>> {
        let prompt = PromptBuilder::prescription_prompt(ocr_text);
        let raw = self.llm.complete(&prompt, self.options).await?;
        tracing::debug!("Parser raw output: {}", raw);

        let values = extract_json_array(&raw)?;
        let mut entries = Vec::with_capacity(values.len());

        for value in values {
            match serde_json::from_value::<MedicineEntry>(value) {
                Ok(entry) if !entry.medicine.is_empty() => entries.push(entry),
                Ok(_) => tracing::debug!("Dropping entry without medicine name"),
                Err(e) => tracing::warn!("Skipping malformed medicine entry: {}", e),
            }
        }

        tracing::info!("Parsed {} medicines", entries.len());
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::CannedLlm;

    #[test]
    fn test_extract_from_chatty_output() {
        let text = "Here is the JSON:\n```json\n[{\"medicine\": \"paracetamol\"}]\n```\nHope this helps!";
        let values = extract_json_array(text).unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0]["medicine"], "paracetamol");
    }

    #[test]
    fn test_extract_without_array() {
        let err = extract_json_array("I could not read the prescription.").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Parse error: No JSON array found in LLM response"
        );
    }

    #[test]
    fn test_extract_invalid_json() {
        assert!(matches!(
            extract_json_array("[{medicine: paracetamol}]"),
            Err(Error::Parse(_))
        ));
    }

    #[tokio::test]
    async fn test_parse_uses_parse_budget() {
        let llm = CannedLlm::ok(
            r#"[
                {"medicine": "paracetamol", "dosage": "500mg", "frequency": "twice daily", "duration": "5 days"},
                {"medicine": "", "dosage": "1 tablet"},
                {"medicine": "amoxicillin", "dosage": "250mg", "frequency": "three times daily", "duration": null}
            ]"#,
        );
        let parser = PrescriptionParser::new(llm.clone(), &LlmConfig::default());

        let entries = parser.parse("Dolo 1-0-1 5d; Mox 250 TDS").await.unwrap();
        assert_eq!(
            entries,
            vec![
                MedicineEntry::new("paracetamol", "500mg", "twice daily", "5 days"),
                MedicineEntry::new("amoxicillin", "250mg", "three times daily", ""),
            ]
        );

        let prompts = llm.prompts.lock();
        assert_eq!(prompts[0].1, CompletionOptions::new(0.1, 1000));
        assert!(prompts[0].0.contains("Dolo 1-0-1 5d; Mox 250 TDS"));
    }

    #[tokio::test]
    async fn test_parse_propagates_llm_error() {
        let parser = PrescriptionParser::new(CannedLlm::failing("rate limited"), &LlmConfig::default());
        assert!(matches!(parser.parse("text").await, Err(Error::Llm(_))));
    }
}
