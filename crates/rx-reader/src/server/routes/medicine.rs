//! Medicine information endpoint

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use crate::server::state::AppState;

const UNAVAILABLE: &str =
    "Information currently unavailable. Please try again or consult a healthcare professional.";

/// Response for `GET /medicine/:name`
#[derive(Debug, Serialize)]
pub struct MedicineResponse {
    pub info: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generic_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grounded: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// GET /medicine/:name - grounded medicine information
pub async fn medicine_info(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Json<MedicineResponse> {
    tracing::info!("Medicine info request: {}", name);

    match state.lookup().lookup(&name).await {
        Ok(info) => Json(MedicineResponse {
            info: info.info,
            status: "success",
            generic_name: Some(info.generic_name),
            grounded: Some(info.grounded),
            error: None,
        }),
        Err(e) => {
            tracing::error!("Medicine lookup failed for '{}': {}", name, e);
            Json(MedicineResponse {
                info: UNAVAILABLE.to_string(),
                status: "error",
                generic_name: None,
                grounded: None,
                error: Some(e.to_string()),
            })
        }
    }
}
