//! Prescription upload endpoint

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::prescription::MedicineEntry;
use crate::server::state::AppState;
use crate::storage::{PrescriptionRecord, PrescriptionSource};

const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tif", "tiff", "webp", "pdf"];

/// Response for `POST /upload`
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub ocr_text: String,
    pub parsed_medicines: Vec<MedicineEntry>,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prescription_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UploadResponse {
    fn failure(message: String) -> Self {
        Self {
            ocr_text: String::new(),
            parsed_medicines: Vec::new(),
            status: "error",
            prescription_id: None,
            error: Some(message),
        }
    }
}

/// POST /upload - OCR and parse a prescription
///
/// Failures are reported in the body with `status: "error"` rather than
/// through the HTTP status.
pub async fn upload_prescription(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Json<UploadResponse> {
    match process_upload(&state, multipart).await {
        Ok(response) => Json(response),
        Err(e) => {
            tracing::error!("Upload failed: {}", e);
            Json(UploadResponse::failure(e.to_string()))
        }
    }
}

async fn process_upload(state: &AppState, mut multipart: Multipart) -> Result<UploadResponse> {
    let mut saved: Option<PathBuf> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::BadRequest(format!("Failed to read multipart field: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or("upload.png").to_string();
        let extension = upload_extension(&filename)?;
        let data = field
            .bytes()
            .await
            .map_err(|e| Error::BadRequest(format!("Failed to read file: {}", e)))?;

        if data.is_empty() {
            return Err(Error::BadRequest("Uploaded file is empty".to_string()));
        }

        let path = state
            .config()
            .server
            .upload_dir
            .join(format!("{}.{}", Uuid::new_v4(), extension));
        tokio::fs::create_dir_all(&state.config().server.upload_dir).await?;
        tokio::fs::write(&path, &data).await?;

        tracing::info!("Saved upload {} ({} bytes) as {}", filename, data.len(), path.display());
        saved = Some(path);
        break;
    }

    let path = saved.ok_or_else(|| Error::BadRequest("Missing multipart field 'file'".to_string()))?;
    let analysis = state.pipeline().analyze(&path).await;

    // only the OCR text is retained
    if let Err(e) = tokio::fs::remove_file(&path).await {
        tracing::warn!("Failed to remove upload {}: {}", path.display(), e);
    }
    let analysis = analysis?;

    let record = PrescriptionRecord::new(PrescriptionSource::Upload, None, &analysis);
    let prescription_id = match state.store().insert(&record) {
        Ok(()) => Some(record.id),
        Err(e) => {
            tracing::warn!("Failed to record prescription history: {}", e);
            None
        }
    };

    Ok(UploadResponse {
        ocr_text: analysis.ocr_text,
        parsed_medicines: analysis.medicines,
        status: "success",
        prescription_id,
        error: None,
    })
}

/// Lowercased extension of an uploaded file name, checked against the supported formats
fn upload_extension(filename: &str) -> Result<String> {
    let extension = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_else(|| "png".to_string());

    if ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        Ok(extension)
    } else {
        Err(Error::BadRequest(format!("Unsupported file type: .{}", extension)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_extension() {
        assert_eq!(upload_extension("Scan.PDF").unwrap(), "pdf");
        assert_eq!(upload_extension("photo.jpeg").unwrap(), "jpeg");
        assert_eq!(upload_extension("no_extension").unwrap(), "png");
        assert!(matches!(upload_extension("notes.docx"), Err(Error::BadRequest(_))));
    }
}
