//! HTTP server for the prescription API

pub mod routes;
pub mod state;

use axum::{extract::State, http::StatusCode, routing::get, Router};
use std::net::SocketAddr;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::RxConfig;
use crate::error::{Error, Result};
use state::AppState;

/// Prescription API server
pub struct RxServer {
    config: RxConfig,
    state: AppState,
}

impl RxServer {
    /// Create a new server, initialising providers, index and storage
    pub async fn new(config: RxConfig) -> Result<Self> {
        let state = AppState::new(config.clone()).await?;
        Ok(Self { config, state })
    }

    /// Start the server
    pub async fn start(self) -> Result<()> {
        let addr: SocketAddr = self
            .config
            .server_address()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid address: {}", e)))?;

        let router = build_router(self.state);

        tracing::info!("Starting prescription API on http://{}", addr);
        tracing::info!("API documentation: http://{}/api/info", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Config(format!("Failed to bind: {}", e)))?;

        axum::serve(listener, router)
            .await
            .map_err(|e| Error::Internal(format!("Server error: {}", e)))?;

        Ok(())
    }

    pub fn address(&self) -> String {
        self.config.server_address()
    }
}

/// Build the router with all routes
pub fn build_router(state: AppState) -> Router {
    let server = &state.config().server;
    let enable_cors = server.enable_cors;
    let max_upload_size = server.max_upload_size;

    let router = Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness))
        .merge(routes::pipeline_routes(max_upload_size))
        .nest("/api", routes::api_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new());

    if enable_cors {
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else {
        router
    }
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Readiness check endpoint
async fn readiness(State(state): State<AppState>) -> StatusCode {
    if state.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    use crate::knowledge::{IndexBuilder, MedicineLookup};
    use crate::ocr::ImagePreprocessor;
    use crate::prescription::{PrescriptionParser, PrescriptionPipeline};
    use crate::storage::PrescriptionStore;
    use crate::testing::{write_test_image, CannedLlm, FakeOcr, KeywordEmbedder};

    const PARSED: &str = r#"Here you go:
[{"medicine": "paracetamol", "dosage": "500mg", "frequency": "twice daily", "duration": "3 days"}]"#;

    struct Harness {
        state: AppState,
        _dir: tempfile::TempDir,
    }

    async fn harness(ocr: Arc<FakeOcr>, llm: Arc<CannedLlm>) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let mut config = RxConfig::default();
        config.server.upload_dir = dir.path().join("uploads");

        let embedder = KeywordEmbedder::new(&["paracetamol", "ibuprofen"]);
        let index = IndexBuilder::new(embedder.clone(), "kw", true)
            .build_from_passages(
                vec![
                    "Paracetamol treats fever and mild pain.".to_string(),
                    "Ibuprofen is a non-steroidal anti-inflammatory drug.".to_string(),
                ],
                |_| {},
            )
            .await
            .unwrap();

        let pipeline = PrescriptionPipeline::new(
            ImagePreprocessor::new(&config.ocr),
            ocr,
            PrescriptionParser::new(llm.clone(), &config.llm),
        );
        let lookup = MedicineLookup::new(embedder, llm, Arc::new(index), &config);
        let store = PrescriptionStore::in_memory().unwrap();

        Harness {
            state: AppState::from_parts(config, pipeline, lookup, store),
            _dir: dir,
        }
    }

    async fn send(state: &AppState, request: Request<Body>) -> (StatusCode, Value) {
        let response = build_router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn multipart_upload(field: &str, filename: &str, content: &[u8]) -> Request<Body> {
        let boundary = "rxboundary";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{b}\r\nContent-Disposition: form-data; name=\"{f}\"; filename=\"{n}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n",
                b = boundary,
                f = field,
                n = filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

        Request::builder()
            .method("POST")
            .uri("/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", boundary),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_root_and_health() {
        let h = harness(FakeOcr::returning(""), CannedLlm::ok("[]")).await;

        let (status, body) = send(&h.state, get("/")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Prescription Parser API is running");

        let response = build_router(h.state.clone()).oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        h.state.set_ready(false);
        let response = build_router(h.state.clone()).oneshot(get("/ready")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_upload_success_records_history() {
        let h = harness(FakeOcr::returning("Tab Crocin 500 BD x3d"), CannedLlm::ok(PARSED)).await;
        let image_dir = tempfile::tempdir().unwrap();
        let image = std::fs::read(write_test_image(image_dir.path(), "rx.png")).unwrap();

        let (status, body) = send(&h.state, multipart_upload("file", "rx.png", &image)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(body["ocr_text"], "Tab Crocin 500 BD x3d");
        assert_eq!(body["parsed_medicines"][0]["medicine"], "paracetamol");
        assert!(body.get("error").is_none());

        let id = body["prescription_id"].as_str().unwrap();
        let (status, record) = send(&h.state, get(&format!("/api/prescriptions/{}", id))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(record["source"], "upload");

        let (_, list) = send(&h.state, get("/api/prescriptions?limit=10")).await;
        assert_eq!(list["total"], 1);
    }

    #[tokio::test]
    async fn test_uploads_get_unique_names_and_are_removed() {
        let ocr = FakeOcr::returning("Tab Dolo 650 TDS");
        let h = harness(ocr.clone(), CannedLlm::ok(PARSED)).await;
        let image_dir = tempfile::tempdir().unwrap();
        let image = std::fs::read(write_test_image(image_dir.path(), "rx.png")).unwrap();

        for _ in 0..2 {
            let (_, body) = send(&h.state, multipart_upload("file", "rx.png", &image)).await;
            assert_eq!(body["status"], "success");
        }

        let seen = ocr.seen_paths();
        assert_eq!(seen.len(), 2);
        assert_ne!(seen[0], seen[1]);

        let upload_dir = &h.state.config().server.upload_dir;
        assert!(seen.iter().all(|p| p.starts_with(upload_dir)));
        assert_eq!(std::fs::read_dir(upload_dir).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_failed_upload_is_removed() {
        let h = harness(FakeOcr::failing("tesseract missing"), CannedLlm::ok(PARSED)).await;
        let (_, body) = send(&h.state, multipart_upload("file", "scan.pdf", b"%PDF-1.4")).await;
        assert_eq!(body["status"], "error");

        let upload_dir = &h.state.config().server.upload_dir;
        assert_eq!(std::fs::read_dir(upload_dir).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_upload_failure_is_reported_in_body() {
        let h = harness(FakeOcr::failing("tesseract missing"), CannedLlm::ok(PARSED)).await;

        let (status, body) = send(&h.state, multipart_upload("file", "scan.pdf", b"%PDF-1.4")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "error");
        assert_eq!(body["ocr_text"], "");
        assert_eq!(body["parsed_medicines"], Value::Array(vec![]));
        assert!(body["error"].as_str().unwrap().contains("tesseract missing"));
    }

    #[tokio::test]
    async fn test_upload_without_file_field() {
        let h = harness(FakeOcr::returning("x"), CannedLlm::ok(PARSED)).await;
        let (_, body) = send(&h.state, multipart_upload("document", "rx.png", b"abc")).await;
        assert_eq!(body["status"], "error");
        assert!(body["error"].as_str().unwrap().contains("'file'"));
    }

    #[tokio::test]
    async fn test_medicine_lookup() {
        let h = harness(FakeOcr::returning(""), CannedLlm::ok("Paracetamol reduces fever.")).await;

        let (status, body) = send(&h.state, get("/medicine/Crocin")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(body["generic_name"], "paracetamol");
        assert_eq!(body["grounded"], true);
        assert!(body["info"].as_str().unwrap().starts_with("Paracetamol reduces fever."));
    }

    #[tokio::test]
    async fn test_medicine_lookup_failure() {
        let h = harness(FakeOcr::returning(""), CannedLlm::failing("quota exceeded")).await;

        let (status, body) = send(&h.state, get("/medicine/ibuprofen")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "error");
        assert_eq!(
            body["info"],
            "Information currently unavailable. Please try again or consult a healthcare professional."
        );
    }

    #[tokio::test]
    async fn test_whatsapp_analyze() {
        let h = harness(FakeOcr::returning("Dolo 650 1-0-1"), CannedLlm::ok(PARSED)).await;
        let image_dir = tempfile::tempdir().unwrap();
        let image = write_test_image(image_dir.path(), "media.jpg");

        let request = Request::builder()
            .method("POST")
            .uri("/whatsapp/analyze")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                serde_json::json!({"file_path": image, "profile": "Mother"}).to_string(),
            ))
            .unwrap();
        let (status, body) = send(&h.state, request).await;

        assert_eq!(status, StatusCode::OK);
        let summary = body["summary"].as_str().unwrap();
        assert!(summary.starts_with("📄 Prescription Summary (Mother)\n"));
        assert!(summary.contains("💊 Paracetamol\n• Dosage: 500mg"));

        let records = h.state.store().list(1).unwrap();
        assert_eq!(records[0].profile.as_deref(), Some("Mother"));
    }

    #[tokio::test]
    async fn test_whatsapp_analyze_unreadable() {
        let h = harness(FakeOcr::failing("no text"), CannedLlm::ok(PARSED)).await;

        let request = Request::builder()
            .method("POST")
            .uri("/whatsapp/analyze")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"file_path": "missing.pdf"}"#))
            .unwrap();
        let (_, body) = send(&h.state, request).await;

        assert_eq!(
            body["summary"],
            "⚠️ I couldn't clearly read this prescription.\nPlease upload a clearer image or consult your doctor."
        );
        assert_eq!(h.state.store().count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unknown_prescription_is_404() {
        let h = harness(FakeOcr::returning(""), CannedLlm::ok("[]")).await;
        let (status, body) = send(
            &h.state,
            get("/api/prescriptions/00000000-0000-0000-0000-000000000000"),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["type"], "not_found");
    }
}
