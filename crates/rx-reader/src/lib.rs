//! rx-reader: prescription OCR, LLM-structured medicine extraction, and grounded medicine lookups
//!
//! Images and scanned PDFs are preprocessed and OCR'd with tesseract, the text
//! is turned into medicine entries by an LLM (Groq or Ollama), and medicine
//! questions are answered from a small embedding-indexed knowledge base behind
//! a confidence gate. A Twilio WhatsApp webhook drives the same pipeline
//! through a short conversation.

pub mod config;
pub mod error;
pub mod generation;
pub mod knowledge;
pub mod ocr;
pub mod prescription;
pub mod providers;
pub mod server;
pub mod storage;
pub mod whatsapp;

#[cfg(test)]
pub(crate) mod testing;

pub use config::RxConfig;
pub use error::{Error, Result};
pub use knowledge::{MedicineInfo, MedicineLookup};
pub use prescription::{MedicineEntry, PrescriptionAnalysis, PrescriptionPipeline};
