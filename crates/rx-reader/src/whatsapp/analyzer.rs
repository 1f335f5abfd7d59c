//! Client side of `POST /whatsapp/analyze`

use async_trait::async_trait;
use reqwest::Client;
use std::path::Path;
use std::time::Duration;

use crate::config::WhatsAppConfig;
use crate::error::{Error, Result};
use crate::server::routes::whatsapp::{AnalyzeRequest, AnalyzeResponse};

/// Turns a stored prescription file into a chat summary
#[async_trait]
pub trait PrescriptionAnalyzer: Send + Sync {
    async fn analyze(&self, file: &Path, profile: &str) -> Result<String>;
}

/// Calls the prescription API over HTTP
pub struct HttpAnalyzer {
    client: Client,
    base_url: String,
}

impl HttpAnalyzer {
    pub fn new(config: &WhatsAppConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.analyzer_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl PrescriptionAnalyzer for HttpAnalyzer {
    async fn analyze(&self, file: &Path, profile: &str) -> Result<String> {
        let url = format!("{}/whatsapp/analyze", self.base_url);
        let request = AnalyzeRequest {
            file_path: file.to_path_buf(),
            profile: profile.to_string(),
        };

        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::internal(format!(
                "Analyzer returned HTTP {} - {}",
                status, body
            )));
        }

        let analyzed: AnalyzeResponse = response.json().await?;
        Ok(analyzed.summary)
    }
}
