//! Brand-name and standard-dosage tables

/// Map a normalised (lowercase, trimmed) brand name to its generic
pub fn brand_to_generic(name: &str) -> Option<&'static str> {
    match name {
        "panrace" | "crocin" | "dolo" | "tylenol" | "calpol" => Some("paracetamol"),
        "amoxil" | "mox" | "augmentin" => Some("amoxicillin"),
        _ => None,
    }
}

/// Typical adult dosing for a common generic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StandardDosage {
    pub dosage: &'static str,
    pub frequency: &'static str,
    pub max_daily: &'static str,
    pub notes: &'static str,
}

static PARACETAMOL: StandardDosage = StandardDosage {
    dosage: "500mg-1000mg per dose",
    frequency: "every 4-6 hours (max 4 times daily)",
    max_daily: "4000mg per day",
    notes: "Take after food",
};

static AMOXICILLIN: StandardDosage = StandardDosage {
    dosage: "250mg-500mg per dose",
    frequency: "three times daily (every 8 hours)",
    max_daily: "1500mg per day for mild infections",
    notes: "Complete the full course",
};

static IBUPROFEN: StandardDosage = StandardDosage {
    dosage: "200mg-400mg per dose",
    frequency: "every 4-6 hours",
    max_daily: "1200mg per day",
    notes: "Take with food",
};

static CETIRIZINE: StandardDosage = StandardDosage {
    dosage: "10mg per dose",
    frequency: "once daily",
    max_daily: "10mg per day",
    notes: "May cause drowsiness",
};

/// Standard dosing for a generic name (case and surrounding space ignored)
pub fn standard_dosage(name: &str) -> Option<&'static StandardDosage> {
    match name.trim().to_lowercase().as_str() {
        "paracetamol" => Some(&PARACETAMOL),
        "amoxicillin" => Some(&AMOXICILLIN),
        "ibuprofen" => Some(&IBUPROFEN),
        "cetirizine" => Some(&CETIRIZINE),
        _ => None,
    }
}

/// Guideline block appended to medicine answers, empty when the generic is unknown
pub fn standard_dosage_note(name: &str) -> String {
    match standard_dosage(name) {
        Some(info) => format!(
            "\n\nStandard Dosage Guidelines:\n\n\
             Typical dose: {}\n\
             Frequency: {}\n\
             Maximum daily dose: {}\n\
             Important note: {}\n\n\
             Disclaimer: These are general guidelines. Always follow your doctor's prescription.",
            info.dosage, info.frequency, info.max_daily, info.notes
        ),
        None => String::new(),
    }
}
