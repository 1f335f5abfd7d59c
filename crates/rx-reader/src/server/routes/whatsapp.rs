//! Analysis endpoint used by the WhatsApp bot

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::prescription::format_whatsapp_summary;
use crate::server::state::AppState;
use crate::storage::{PrescriptionRecord, PrescriptionSource};

/// Request for `POST /whatsapp/analyze`
#[derive(Debug, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    /// File saved by the bot, readable by this server
    pub file_path: PathBuf,
    #[serde(default = "default_profile")]
    pub profile: String,
}

fn default_profile() -> String {
    "Self".to_string()
}

/// Response for `POST /whatsapp/analyze`
#[derive(Debug, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub summary: String,
}

/// POST /whatsapp/analyze - analyse a stored file into a chat summary
pub async fn analyze_for_whatsapp(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Json<AnalyzeResponse> {
    tracing::info!(
        "WhatsApp analysis for profile '{}': {}",
        request.profile,
        request.file_path.display()
    );

    let medicines = match state.pipeline().analyze(&request.file_path).await {
        Ok(analysis) => {
            let record = PrescriptionRecord::new(
                PrescriptionSource::Whatsapp,
                Some(request.profile.clone()),
                &analysis,
            );
            if let Err(e) = state.store().insert(&record) {
                tracing::warn!("Failed to record prescription history: {}", e);
            }
            analysis.medicines
        }
        Err(e) => {
            tracing::error!("WhatsApp analysis failed: {}", e);
            Vec::new()
        }
    };

    Json(AnalyzeResponse {
        summary: format_whatsapp_summary(&request.profile, &medicines),
    })
}
