//! Prescription history endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::storage::PrescriptionRecord;

/// Query parameters for listing prescriptions
#[derive(Debug, Deserialize)]
pub struct ListPrescriptionsQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    50
}

/// Response for prescription list
#[derive(Debug, Serialize)]
pub struct PrescriptionListResponse {
    pub prescriptions: Vec<PrescriptionRecord>,
    /// Total stored (before the limit)
    pub total: usize,
}

/// GET /api/prescriptions - newest first
pub async fn list_prescriptions(
    State(state): State<AppState>,
    Query(query): Query<ListPrescriptionsQuery>,
) -> Result<Json<PrescriptionListResponse>> {
    let store = state.store();
    Ok(Json(PrescriptionListResponse {
        prescriptions: store.list(query.limit.min(500))?,
        total: store.count()?,
    }))
}

/// GET /api/prescriptions/:id
pub async fn get_prescription(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PrescriptionRecord>> {
    state
        .store()
        .get(id)?
        .map(Json)
        .ok_or_else(|| Error::NotFound(format!("prescription {}", id)))
}
