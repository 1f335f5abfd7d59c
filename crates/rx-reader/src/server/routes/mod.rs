//! Routes for the prescription API

pub mod medicine;
pub mod prescriptions;
pub mod upload;
pub mod whatsapp;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use crate::server::state::AppState;

/// Public pipeline routes
pub fn pipeline_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route(
            "/upload",
            post(upload::upload_prescription).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        .route("/medicine/:name", get(medicine::medicine_info))
        .route("/whatsapp/analyze", post(whatsapp::analyze_for_whatsapp))
}

/// History and info routes, nested under `/api`
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/prescriptions", get(prescriptions::list_prescriptions))
        .route("/prescriptions/:id", get(prescriptions::get_prescription))
        .route("/info", get(info))
}

async fn root() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "message": "Prescription Parser API is running"
    }))
}

/// API info endpoint
async fn info() -> Json<Value> {
    Json(json!({
        "name": "rx-reader",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Prescription OCR, medicine extraction, and grounded medicine information",
        "endpoints": {
            "POST /upload": "Upload a prescription image or PDF (multipart field `file`)",
            "GET /medicine/:name": "Information about a medicine, grounded in the knowledge base",
            "POST /whatsapp/analyze": "Analyse a stored file and return a chat summary",
            "GET /api/prescriptions": "List analysed prescriptions (newest first)",
            "GET /api/prescriptions/:id": "Get one analysed prescription",
            "GET /health": "Liveness",
            "GET /ready": "Readiness"
        }
    }))
}
