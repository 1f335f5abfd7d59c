//! Prescription reading: OCR text → structured medicine entries

pub mod parser;
pub mod pipeline;
pub mod summary;
pub mod types;

pub use parser::{extract_json_array, PrescriptionParser};
pub use pipeline::PrescriptionPipeline;
pub use summary::{format_whatsapp_summary, title_case};
pub use types::{MedicineEntry, PrescriptionAnalysis};
