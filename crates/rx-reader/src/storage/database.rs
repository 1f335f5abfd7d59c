//! SQLite prescription history

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::prescription::{MedicineEntry, PrescriptionAnalysis};

/// Where a prescription came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrescriptionSource {
    Upload,
    Whatsapp,
}

impl PrescriptionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrescriptionSource::Upload => "upload",
            PrescriptionSource::Whatsapp => "whatsapp",
        }
    }

    fn parse(s: &str) -> Self {
        match s {
            "whatsapp" => PrescriptionSource::Whatsapp,
            _ => PrescriptionSource::Upload,
        }
    }
}

/// A stored prescription analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrescriptionRecord {
    pub id: Uuid,
    pub source: PrescriptionSource,
    /// Family profile chosen in the chat flow
    pub profile: Option<String>,
    pub ocr_text: String,
    pub medicines: Vec<MedicineEntry>,
    pub created_at: DateTime<Utc>,
}

impl PrescriptionRecord {
    pub fn new(
        source: PrescriptionSource,
        profile: Option<String>,
        analysis: &PrescriptionAnalysis,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            source,
            profile,
            ocr_text: analysis.ocr_text.clone(),
            medicines: analysis.medicines.clone(),
            created_at: Utc::now(),
        }
    }
}

/// SQLite-based prescription store
pub struct PrescriptionStore {
    conn: Arc<Mutex<Connection>>,
}

impl PrescriptionStore {
    /// Create or open the database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)
            .map_err(|e| Error::storage(format!("Failed to open database: {}", e)))?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.migrate()?;

        tracing::info!("Prescription store opened at {}", path.display());
        Ok(store)
    }

    /// Create an in-memory database
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::storage(format!("Failed to open in-memory database: {}", e)))?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            "#,
        )
        .map_err(|e| Error::storage(format!("Failed to set pragmas: {}", e)))?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS prescriptions (
                id TEXT PRIMARY KEY,
                source TEXT NOT NULL,
                profile TEXT,
                ocr_text TEXT NOT NULL,
                medicines_json TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_prescriptions_created_at ON prescriptions(created_at);
            "#,
        )
        .map_err(|e| Error::storage(format!("Failed to create tables: {}", e)))?;

        Ok(())
    }

    /// Insert a record
    pub fn insert(&self, record: &PrescriptionRecord) -> Result<()> {
        let medicines_json = serde_json::to_string(&record.medicines)?;
        let conn = self.conn.lock();

        conn.execute(
            "INSERT INTO prescriptions (id, source, profile, ocr_text, medicines_json, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.id.to_string(),
                record.source.as_str(),
                record.profile,
                record.ocr_text,
                medicines_json,
                record.created_at.to_rfc3339(),
            ],
        )
        .map_err(|e| Error::storage(format!("Failed to insert prescription: {}", e)))?;

        tracing::debug!("Stored prescription {}", record.id);
        Ok(())
    }

    /// Get a record by id
    pub fn get(&self, id: Uuid) -> Result<Option<PrescriptionRecord>> {
        let conn = self.conn.lock();

        let mut stmt = conn
            .prepare(
                "SELECT id, source, profile, ocr_text, medicines_json, created_at
                 FROM prescriptions WHERE id = ?1",
            )
            .map_err(|e| Error::storage(format!("Failed to prepare query: {}", e)))?;

        let record = stmt
            .query_row(params![id.to_string()], row_to_record)
            .optional()
            .map_err(|e| Error::storage(format!("Failed to get prescription: {}", e)))?;

        Ok(record)
    }

    /// Most recent records first
    pub fn list(&self, limit: usize) -> Result<Vec<PrescriptionRecord>> {
        let conn = self.conn.lock();

        let mut stmt = conn
            .prepare(
                "SELECT id, source, profile, ocr_text, medicines_json, created_at
                 FROM prescriptions ORDER BY created_at DESC, rowid DESC LIMIT ?1",
            )
            .map_err(|e| Error::storage(format!("Failed to prepare query: {}", e)))?;

        let records = stmt
            .query_map(params![limit as i64], row_to_record)
            .map_err(|e| Error::storage(format!("Failed to list prescriptions: {}", e)))?
            .filter_map(|r| r.ok())
            .collect();

        Ok(records)
    }

    pub fn count(&self) -> Result<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM prescriptions", [], |row| row.get(0))
            .map_err(|e| Error::storage(format!("Failed to count prescriptions: {}", e)))?;
        Ok(count as usize)
    }
}

fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<PrescriptionRecord> {
    let id_str: String = row.get(0)?;
    let source_str: String = row.get(1)?;
    let profile: Option<String> = row.get(2)?;
    let ocr_text: String = row.get(3)?;
    let medicines_json: String = row.get(4)?;
    let created_at_str: String = row.get(5)?;

    Ok(PrescriptionRecord {
        id: Uuid::parse_str(&id_str).unwrap_or_else(|_| Uuid::nil()),
        source: PrescriptionSource::parse(&source_str),
        profile,
        ocr_text,
        medicines: serde_json::from_str(&medicines_json).unwrap_or_default(),
        created_at: DateTime::parse_from_rfc3339(&created_at_str)
            .map(|d| d.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    })
}
