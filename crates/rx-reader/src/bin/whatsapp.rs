//! WhatsApp webhook binary
//!
//! Point the Twilio sandbox "when a message comes in" URL at
//! `http://<host>:<port>/whatsapp`.

use std::net::SocketAddr;
use std::sync::Arc;

use rx_reader::config::RxConfig;
use rx_reader::whatsapp::{router, HttpAnalyzer, TwilioMediaClient, WhatsAppBot};
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

    let config = RxConfig::load(None)?.whatsapp;

    let analyzer = Arc::new(HttpAnalyzer::new(&config)?);
    let media = Arc::new(TwilioMediaClient::new(&config)?);
    tokio::fs::create_dir_all(&config.upload_dir).await?;

    let addr: SocketAddr = config.address().parse()?;
    tracing::info!("Analyzer API: {}", config.analyzer_url);
    tracing::info!("Profiles configured for {} numbers", config.profiles.len());

    let bot = Arc::new(WhatsAppBot::new(config, analyzer, media));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("WhatsApp webhook listening on http://{}/whatsapp", addr);
    axum::serve(listener, router(bot)).await?;

    Ok(())
}
