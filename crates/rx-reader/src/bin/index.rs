//! Build the medicine knowledge index from a text corpus
//!
//! Run with: cargo run -p rx-reader --bin rx-reader-index -- --corpus knowledge/medicines.txt

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

use rx_reader::config::RxConfig;
use rx_reader::knowledge::{read_corpus, IndexBuilder};
use rx_reader::providers::embedder_from_config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about = "Embed the medicine corpus into a knowledge index")]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "RX_READER_CONFIG")]
    config: Option<PathBuf>,

    /// Corpus file, one passage per line (defaults to knowledge.corpus_path)
    #[arg(long)]
    corpus: Option<PathBuf>,

    /// Output index file (defaults to knowledge.index_path)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rx_reader=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = RxConfig::load(cli.config.as_deref())?;

    let corpus = cli.corpus.unwrap_or_else(|| config.knowledge.corpus_path.clone());
    let output = cli.output.unwrap_or_else(|| config.knowledge.index_path.clone());

    let embedder = embedder_from_config(&config)?;
    if !embedder.health_check().await? {
        anyhow::bail!(
            "Embedding server not reachable at {} (is `ollama serve` running and `ollama pull {}` done?)",
            config.embeddings.base_url,
            config.embeddings.model
        );
    }

    let passages = read_corpus(&corpus)?;
    let progress = ProgressBar::new(passages.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("{spinner} [{bar:40}] {pos}/{len} passages ({eta})")?
            .progress_chars("#>-"),
    );

    let builder = IndexBuilder::new(
        embedder,
        config.embeddings.model.clone(),
        config.embeddings.normalize,
    );
    let index = builder
        .build_from_passages(passages, |done| progress.set_position(done as u64))
        .await?;
    progress.finish_and_clear();

    index.save(&output)?;
    println!("Indexed {} passages into {}", index.len(), output.display());

    Ok(())
}
