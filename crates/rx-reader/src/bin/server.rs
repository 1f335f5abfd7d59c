//! Prescription API server binary
//!
//! Run with: cargo run -p rx-reader --bin rx-reader-server

use rx_reader::{config::RxConfig, server::RxServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rx_reader=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!(
        r#"
╔═══════════════════════════════════════════════════════════╗
║                         Rx Reader                         ║
║        Prescription OCR and Medicine Information          ║
╚═══════════════════════════════════════════════════════════╝
"#
    );

    let config = RxConfig::load(None)?;
    config.validate()?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - LLM: {:?} ({})", config.llm.backend, config.llm.model);
    tracing::info!(
        "  - Embeddings: {} ({} dimensions) at {}",
        config.embeddings.model,
        config.embeddings.dimensions,
        config.embeddings.base_url
    );
    tracing::info!("  - Knowledge corpus: {}", config.knowledge.corpus_path.display());
    tracing::info!("  - History: {}", config.storage.database_path.display());

    let server = RxServer::new(config).await?;

    println!("\nServer starting...");
    println!("  API: http://{}", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("  API Info: http://{}/api/info", server.address());
    println!("\nEndpoints:");
    println!("  POST /upload             - Read a prescription");
    println!("  GET  /medicine/:name     - Medicine information");
    println!("  POST /whatsapp/analyze   - Chat summary for a stored file");
    println!("  GET  /api/prescriptions  - History");
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
