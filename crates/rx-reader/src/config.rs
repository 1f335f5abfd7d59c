//! Configuration for the prescription reader
//!
//! Defaults work for a local setup (Ollama for embeddings, Groq for
//! generation). A TOML file and a handful of environment variables can
//! override them.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Environment variable naming a TOML config file
pub const CONFIG_PATH_ENV: &str = "RX_READER_CONFIG";

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RxConfig {
    /// HTTP API configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// LLM (Groq or Ollama) configuration
    #[serde(default)]
    pub llm: LlmConfig,
    /// Embedding configuration
    #[serde(default)]
    pub embeddings: EmbeddingConfig,
    /// Medicine knowledge base configuration
    #[serde(default)]
    pub knowledge: KnowledgeConfig,
    /// OCR configuration
    #[serde(default)]
    pub ocr: OcrConfig,
    /// Prescription history storage
    #[serde(default)]
    pub storage: StorageConfig,
    /// Medicine info answer cache
    #[serde(default)]
    pub cache: CacheConfig,
    /// WhatsApp bot configuration
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,
}

impl RxConfig {
    /// Load configuration
    ///
    /// Reads `path` if given, otherwise the file named by `RX_READER_CONFIG`,
    /// otherwise starts from defaults. Environment overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from));

        let mut config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(&path).map_err(|e| {
                    Error::Config(format!("Failed to read {}: {}", path.display(), e))
                })?;
                let config = Self::from_toml(&content)?;
                tracing::info!("Loaded configuration from {}", path.display());
                config
            }
            None => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse a TOML document
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))
    }

    /// Apply environment overrides using the given lookup
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("GROQ_API_KEY").filter(|k| !k.is_empty()) {
            self.llm.api_key = Some(key);
        }
        if let Some(host) = lookup("RX_READER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("RX_READER_PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!("Ignoring invalid RX_READER_PORT: {}", port),
            }
        }
        if let Some(url) = lookup("OLLAMA_URL") {
            self.llm.ollama_url = url.clone();
            self.embeddings.base_url = url;
        }
        if let Some(cmd) = lookup("TESSERACT_CMD").filter(|c| !c.is_empty()) {
            self.ocr.tesseract_cmd = cmd;
        }
        if let Some(sid) = lookup("TWILIO_ACCOUNT_SID") {
            self.whatsapp.twilio_account_sid = Some(sid);
        }
        if let Some(token) = lookup("TWILIO_AUTH_TOKEN") {
            self.whatsapp.twilio_auth_token = Some(token);
        }
    }

    /// Check the configuration for values the pipeline cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.llm.backend == LlmBackend::Groq
            && self.llm.api_key.as_deref().map_or(true, str::is_empty)
        {
            return Err(Error::Config(
                "Groq backend selected but GROQ_API_KEY is not set".to_string(),
            ));
        }
        if self.embeddings.dimensions == 0 {
            return Err(Error::Config("embeddings.dimensions must be > 0".to_string()));
        }
        if self.knowledge.top_k == 0 {
            return Err(Error::Config("knowledge.top_k must be > 0".to_string()));
        }
        if self.knowledge.distance_threshold <= 0.0 {
            return Err(Error::Config(
                "knowledge.distance_threshold must be positive".to_string(),
            ));
        }
        if self.server.upload_dir.as_os_str().is_empty() {
            return Err(Error::Config("server.upload_dir must not be empty".to_string()));
        }
        Ok(())
    }

    /// Address the HTTP API binds to
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS (allow any origin)
    pub enable_cors: bool,
    /// Maximum upload size in bytes (default: 20MB)
    pub max_upload_size: usize,
    /// Directory uploaded prescriptions are written to
    pub upload_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            enable_cors: true,
            max_upload_size: 20 * 1024 * 1024,
            upload_dir: PathBuf::from("uploads"),
        }
    }
}

/// Which service answers completion requests
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LlmBackend {
    /// Groq (OpenAI-compatible chat completions)
    #[default]
    Groq,
    /// Local Ollama server
    Ollama,
}

/// LLM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Completion backend
    pub backend: LlmBackend,
    /// Groq API base URL
    pub groq_url: String,
    /// Groq API key (usually from GROQ_API_KEY)
    pub api_key: Option<String>,
    /// Ollama base URL
    pub ollama_url: String,
    /// Generation model name
    pub model: String,
    /// Temperature for generation
    pub temperature: f32,
    /// Token budget for prescription parsing
    pub parse_max_tokens: u32,
    /// Token budget for medicine information answers
    pub info_max_tokens: u32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            backend: LlmBackend::Groq,
            groq_url: "https://api.groq.com/openai/v1".to_string(),
            api_key: None,
            ollama_url: "http://localhost:11434".to_string(),
            model: "llama-3.1-8b-instant".to_string(),
            temperature: 0.1,
            parse_max_tokens: 1000,
            info_max_tokens: 800,
            timeout_secs: 60,
            max_retries: 2,
        }
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Ollama base URL serving the embedding model
    pub base_url: String,
    /// Model to use (default: all-minilm, the MiniLM-L6-v2 sentence model)
    pub model: String,
    /// Embedding dimensions (384 for MiniLM)
    pub dimensions: usize,
    /// L2-normalise vectors before indexing and search
    pub normalize: bool,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "all-minilm".to_string(),
            dimensions: 384,
            normalize: true,
            timeout_secs: 30,
            max_retries: 2,
        }
    }
}

/// Medicine knowledge base configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeConfig {
    /// Plain text corpus, one passage per line
    pub corpus_path: PathBuf,
    /// Persisted embedding index
    pub index_path: PathBuf,
    /// Neighbours fetched per query variation
    pub top_k: usize,
    /// Best squared L2 distance above which the lookup is refused
    pub distance_threshold: f32,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            corpus_path: PathBuf::from("knowledge/medicines.txt"),
            index_path: PathBuf::from("knowledge/index.json"),
            top_k: 5,
            distance_threshold: 1.0,
        }
    }
}

/// OCR configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// tesseract binary (name on PATH or absolute path)
    pub tesseract_cmd: String,
    /// pdftoppm binary used to rasterise PDFs
    pub pdftoppm_cmd: String,
    /// Page segmentation mode (6 = uniform block of text)
    pub page_segmentation_mode: u8,
    /// Rasterisation resolution for PDF pages
    pub pdf_dpi: u32,
    /// Contrast enhancement factor
    pub contrast: f32,
    /// Brightness enhancement factor
    pub brightness: f32,
    /// Apply the sharpen filter
    pub sharpen: bool,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            tesseract_cmd: "tesseract".to_string(),
            pdftoppm_cmd: "pdftoppm".to_string(),
            page_segmentation_mode: 6,
            pdf_dpi: 300,
            contrast: 2.0,
            brightness: 1.2,
            sharpen: true,
        }
    }
}

/// Prescription history storage
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database path
    pub database_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let database_path = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("rx-reader")
            .join("prescriptions.db");

        Self { database_path }
    }
}

/// Medicine info cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum cached answers
    pub max_entries: usize,
    /// Time to live in seconds
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 500,
            ttl_secs: 3600,
        }
    }
}

/// WhatsApp bot configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WhatsAppConfig {
    /// Host address for the webhook listener
    pub host: String,
    /// Port for the webhook listener
    pub port: u16,
    /// Base URL of the prescription API (`/whatsapp/analyze`)
    pub analyzer_url: String,
    /// Directory downloaded media is written to
    pub upload_dir: PathBuf,
    /// Twilio account SID for authenticated media download
    pub twilio_account_sid: Option<String>,
    /// Twilio auth token for authenticated media download
    pub twilio_auth_token: Option<String>,
    /// Timeout for analyzer and media requests in seconds
    pub timeout_secs: u64,
    /// Family profiles per phone number (E.164, without the `whatsapp:` prefix)
    pub profiles: HashMap<String, Vec<String>>,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8001,
            analyzer_url: "http://localhost:8000".to_string(),
            upload_dir: PathBuf::from("uploads"),
            twilio_account_sid: None,
            twilio_auth_token: None,
            timeout_secs: 120,
            profiles: HashMap::new(),
        }
    }
}

impl WhatsAppConfig {
    /// Profiles for a phone number, `["Self"]` when none are configured
    pub fn profiles_for(&self, phone_number: &str) -> Vec<String> {
        self.profiles
            .get(phone_number)
            .filter(|p| !p.is_empty())
            .cloned()
            .unwrap_or_else(|| vec!["Self".to_string()])
    }

    /// Address the webhook listener binds to
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
