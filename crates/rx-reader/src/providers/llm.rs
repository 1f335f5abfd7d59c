//! LLM provider trait for prompt completion

use async_trait::async_trait;
use crate::error::Result;

/// Sampling options for a single completion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionOptions {
    /// Sampling temperature
    pub temperature: f32,
    /// Maximum tokens to generate
    pub max_tokens: u32,
}

impl CompletionOptions {
    pub fn new(temperature: f32, max_tokens: u32) -> Self {
        Self {
            temperature,
            max_tokens,
        }
    }
}

/// Trait for LLM-based text completion
///
/// Implementations:
/// - `GroqClient`: Groq hosted models (llama-3.1-8b-instant)
/// - `OllamaClient`: Local Ollama server
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Complete a single user prompt and return the raw model text
    async fn complete(&self, prompt: &str, options: CompletionOptions) -> Result<String>;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}
