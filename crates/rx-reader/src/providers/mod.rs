//! Provider abstractions for embeddings and LLM completion
//!
//! Trait-based so the pipeline can switch between Groq and a local Ollama
//! server, and so tests can substitute canned responses.

pub mod embedding;
pub mod groq;
pub mod llm;
pub mod ollama;
mod retry;

pub use embedding::EmbeddingProvider;
pub use groq::GroqClient;
pub use llm::{CompletionOptions, LlmProvider};
pub use ollama::{OllamaClient, OllamaEmbedder};
pub(crate) use retry::retry_with_backoff;

use std::sync::Arc;

use crate::config::{LlmBackend, RxConfig};
use crate::error::Result;

/// Build the completion provider selected in the configuration
pub fn llm_from_config(config: &RxConfig) -> Result<Arc<dyn LlmProvider>> {
    let provider: Arc<dyn LlmProvider> = match config.llm.backend {
        LlmBackend::Groq => Arc::new(GroqClient::new(&config.llm)?),
        LlmBackend::Ollama => Arc::new(OllamaClient::new(&config.llm)?),
    };
    tracing::info!(
        "LLM provider: {} (model: {})",
        provider.name(),
        provider.model()
    );
    Ok(provider)
}

/// Build the embedding provider
pub fn embedder_from_config(config: &RxConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    Ok(Arc::new(OllamaEmbedder::new(&config.embeddings)?))
}
