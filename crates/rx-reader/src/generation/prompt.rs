//! Prompt templates

/// Prompt builder for the two LLM calls in the pipeline
pub struct PromptBuilder;

impl PromptBuilder {
    /// Prompt that turns raw OCR text into a JSON array of medicines
    pub fn prescription_prompt(ocr_text: &str) -> String {
        format!(
            r#"
You are an expert medical prescription parser. Analyze this doctor's prescription OCR text carefully.

INSTRUCTIONS:
1. **Fix OCR errors**: "panrace" → "paracetamol", "amol" → "amoxicillin", etc.
2. **Convert brands to generics**: Crocin → paracetamol, Dolo → paracetamol, Mox → amoxicillin
3. **Parse dosing patterns**:
   - "1-0-1" or "1 0 1" = morning-none-evening (2 times daily)
   - "1-1-1" or "1 1 1" = morning-afternoon-evening (3 times daily)
   - "0-0-1" = evening only (once daily)
   - "6-1" might mean "1 tablet 6 times" or dosing instruction
4. **Extract information**:
   - DOSAGE: Amount per dose (e.g., "500mg", "1 tablet", "1 capsule")
   - FREQUENCY: Times per day (e.g., "twice daily", "three times daily", "every 8 hours")
   - DURATION: Total treatment period (e.g., "5 days", "1 week")
5. **Medical abbreviations**:
   - BD/BID = twice daily
   - TDS/TID = three times daily
   - QD/OD = once daily
   - QID = four times daily
   - HS = at bedtime
   - AC = before meals
   - PC = after meals

CRITICAL: If dosage/frequency/duration information exists in the text, extract it. Don't leave fields empty unless truly absent.

Return ONLY valid JSON (no markdown, no extra text):

[
  {{
    "medicine": "generic_name_lowercase",
    "dosage": "amount_per_dose",
    "frequency": "times_per_day",
    "duration": "total_duration"
  }}
]

PRESCRIPTION TEXT:
{ocr_text}
"#,
            ocr_text = ocr_text
        )
    }

    /// Grounded prompt describing a medicine from retrieved knowledge passages
    pub fn medicine_info_prompt(medicine: &str, context: &str) -> String {
        format!(
            r#"
You are a medical information expert. Based on the context provided, give comprehensive information about {medicine}.

MEDICAL KNOWLEDGE BASE:
{context}

Please provide a clear, well-structured response covering:

1. What it is: Brief description of the medicine type/class
2. Primary uses: Main conditions it treats
3. How it works: Mechanism of action (if available in context)
4. Typical dosage: Standard doses for adults (if available in context)
5. Important warnings: Key side effects, contraindications, or precautions (if available in context)

FORMATTING REQUIREMENTS:
- Write in clear paragraphs WITHOUT asterisks, markdown formatting, or special characters
- Use simple section headers like "What it is:" or "Primary uses:"
- Write naturally as if explaining to a patient
- Use proper sentences and paragraphs
- NO markdown symbols like **, ##, or ***
- NO bullet points - write in prose format
- If information is not available, say so naturally without asterisks

Requirements:
- Use ONLY information from the context above
- Write in clear, patient-friendly language
- Be accurate and professional
- Do NOT make up information

Write your response in plain text paragraphs only."#,
            medicine = medicine,
            context = context
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prescription_prompt_embeds_text() {
        let prompt = PromptBuilder::prescription_prompt("Tab Dolo 650 1-0-1 x 5 days");
        assert!(prompt.ends_with("PRESCRIPTION TEXT:\nTab Dolo 650 1-0-1 x 5 days\n"));
        assert!(prompt.contains("\"medicine\": \"generic_name_lowercase\""));
        assert!(prompt.contains("TDS/TID = three times daily"));
    }

    #[test]
    fn test_medicine_info_prompt() {
        let prompt = PromptBuilder::medicine_info_prompt("paracetamol", "Paracetamol relieves pain.");
        assert!(prompt.contains("comprehensive information about paracetamol."));
        assert!(prompt.contains("MEDICAL KNOWLEDGE BASE:\nParacetamol relieves pain.\n"));
        assert!(prompt.contains("Use ONLY information from the context above"));
    }
}
