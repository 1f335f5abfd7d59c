//! Media download from Twilio

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use std::time::Duration;

use crate::config::WhatsAppConfig;
use crate::error::{Error, Result};

/// Fetches media attached to an incoming message
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Bytes>;
}

/// Twilio media client, using basic auth when credentials are configured
pub struct TwilioMediaClient {
    client: Client,
    credentials: Option<(String, String)>,
}

impl TwilioMediaClient {
    pub fn new(config: &WhatsAppConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let credentials = match (&config.twilio_account_sid, &config.twilio_auth_token) {
            (Some(sid), Some(token)) if !sid.is_empty() && !token.is_empty() => {
                Some((sid.clone(), token.clone()))
            }
            _ => {
                tracing::warn!("Twilio credentials not set; media downloads are unauthenticated");
                None
            }
        };

        Ok(Self {
            client,
            credentials,
        })
    }
}

#[async_trait]
impl MediaFetcher for TwilioMediaClient {
    async fn fetch(&self, url: &str) -> Result<Bytes> {
        let mut request = self.client.get(url);
        if let Some((sid, token)) = &self.credentials {
            request = request.basic_auth(sid, Some(token));
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(Error::internal(format!(
                "Media download failed: HTTP {}",
                response.status()
            )));
        }

        Ok(response.bytes().await?)
    }
}

/// File extension for a media content type
pub fn media_extension(content_type: Option<&str>) -> &'static str {
    match content_type {
        Some(ct) if ct.contains("pdf") => "pdf",
        _ => "jpg",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_extension() {
        assert_eq!(media_extension(Some("application/pdf")), "pdf");
        assert_eq!(media_extension(Some("image/png")), "jpg");
        assert_eq!(media_extension(None), "jpg");
    }
}
