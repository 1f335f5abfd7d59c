//! Chat-friendly prescription summary

use super::types::MedicineEntry;

/// Reply used when nothing could be parsed
pub const UNREADABLE_SUMMARY: &str =
    "⚠️ I couldn't clearly read this prescription.\nPlease upload a clearer image or consult your doctor.";

const DISCLAIMER: &str = "⚠️ This is an AI-generated summary. Always follow your doctor's advice.";

/// Render parsed medicines as a WhatsApp message for `profile`
pub fn format_whatsapp_summary(profile: &str, medicines: &[MedicineEntry]) -> String {
    if medicines.is_empty() {
        return UNREADABLE_SUMMARY.to_string();
    }

    let mut lines = Vec::with_capacity(medicines.len() + 2);
    lines.push(format!("📄 Prescription Summary ({})\n", profile));

    for med in medicines {
        lines.push(format!(
            "💊 {}\n• Dosage: {}\n• Frequency: {}\n• Duration: {}\n",
            title_case(&med.medicine),
            or_default(&med.dosage, "As prescribed"),
            or_default(&med.frequency, "As directed"),
            or_default(&med.duration, "As advised"),
        ));
    }

    lines.push(DISCLAIMER.to_string());
    lines.join("\n")
}

fn or_default<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() {
        fallback
    } else {
        value
    }
}

/// Uppercase the first letter of every alphabetic run, lowercase the rest
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_word = false;

    for c in text.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }

    out
}
