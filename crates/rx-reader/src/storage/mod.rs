//! Storage module for persistent data storage
//!
//! SQLite-backed history of analysed prescriptions.

mod database;

pub use database::{PrescriptionRecord, PrescriptionSource, PrescriptionStore};
