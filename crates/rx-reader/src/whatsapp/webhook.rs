//! Twilio webhook and the conversation rules

use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Form, Router,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::config::WhatsAppConfig;
use crate::error::Result;

use super::analyzer::PrescriptionAnalyzer;
use super::media::{media_extension, MediaFetcher};
use super::session::{SessionState, SessionStore};
use super::twiml::{message_response, TWIML_CONTENT_TYPE};

const GREETINGS: &[&str] = &["hi", "hello", "start", "help", "hey"];

const HELP_MESSAGE: &str = "👋 Hello! I'm *Rx Reader*.\n\n\
    Here's what I can do:\n\
    📄 Read prescriptions (PDF/image)\n\
    👨‍👩‍👧 Support multiple family profiles\n\
    💊 List each medicine with its dosage, frequency and duration\n\n\
    👉 Just upload a prescription to get started.";

const STILL_ANALYZING: &str =
    "⏳ I'm still reading your last prescription. Please wait a moment.";

const INVALID_CHOICE: &str = "❌ Invalid choice. Please select a valid profile number.";

const ANALYSIS_FAILED: &str = "⚠️ Something went wrong while reading your prescription.\n\
    Reply with the profile number to try again.";

const DOWNLOAD_FAILED: &str = "⚠️ I couldn't download your file. Please send it again.";

const UPLOAD_PROMPT: &str = "👋 Hi!\n\
    Upload a prescription (PDF or image) to get started.\n\
    Type *help* to see what I can do.";

const FALLBACK: &str = "Please upload a prescription (PDF or image).";

/// Twilio webhook form fields
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IncomingMessage {
    #[serde(rename = "Body", default)]
    pub body: String,
    #[serde(rename = "NumMedia", default)]
    pub num_media: u32,
    #[serde(rename = "MediaUrl0")]
    pub media_url: Option<String>,
    #[serde(rename = "MediaContentType0")]
    pub media_content_type: Option<String>,
    #[serde(rename = "From", default)]
    pub from: String,
}

impl IncomingMessage {
    /// Sender without the `whatsapp:` prefix
    pub fn phone_number(&self) -> &str {
        self.from.trim().trim_start_matches("whatsapp:")
    }
}

/// What to do with a text message, decided under the session lock
enum Action {
    Reply(&'static str),
    Analyze { file: PathBuf, profile: String },
}

/// Returns an abandoned analysis to `AwaitingProfile`
///
/// Twilio drops webhook requests that run too long, which drops the
/// handler future while the session is still `Analyzing`.
struct AnalysisGuard<'a> {
    sessions: &'a SessionStore,
    phone: &'a str,
    file: &'a Path,
    armed: bool,
}

impl<'a> AnalysisGuard<'a> {
    fn new(sessions: &'a SessionStore, phone: &'a str, file: &'a Path) -> Self {
        Self {
            sessions,
            phone,
            file,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for AnalysisGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        self.sessions.transition(self.phone, |state| {
            if *state == SessionState::Analyzing {
                tracing::warn!("Analysis for {} abandoned; awaiting profile again", self.phone);
                *state = SessionState::AwaitingProfile {
                    file: self.file.to_path_buf(),
                };
            }
        });
    }
}

/// The conversation engine behind the webhook
pub struct WhatsAppBot {
    config: WhatsAppConfig,
    sessions: SessionStore,
    analyzer: Arc<dyn PrescriptionAnalyzer>,
    media: Arc<dyn MediaFetcher>,
}

impl WhatsAppBot {
    pub fn new(
        config: WhatsAppConfig,
        analyzer: Arc<dyn PrescriptionAnalyzer>,
        media: Arc<dyn MediaFetcher>,
    ) -> Self {
        Self {
            config,
            sessions: SessionStore::new(),
            analyzer,
            media,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Handle one incoming message and return the reply text
    pub async fn handle(&self, message: &IncomingMessage) -> String {
        let phone = message.phone_number().to_string();
        let body = message.body.trim();
        let body_lower = body.to_lowercase();

        if GREETINGS.contains(&body_lower.as_str()) {
            return HELP_MESSAGE.to_string();
        }

        if self.sessions.state(&phone) == SessionState::Analyzing {
            return STILL_ANALYZING.to_string();
        }

        if message.num_media > 0 {
            if let Some(url) = message.media_url.as_deref() {
                return self
                    .receive_media(&phone, url, message.media_content_type.as_deref())
                    .await;
            }
        }

        let profiles = self.config.profiles_for(&phone);
        let action = self.sessions.transition(&phone, |state| {
            let action = match &*state {
                SessionState::AwaitingProfile { file }
                    if !body.is_empty() && body.chars().all(|c| c.is_ascii_digit()) =>
                {
                    match body.parse::<usize>().ok().and_then(|n| n.checked_sub(1)) {
                        Some(choice) if choice < profiles.len() => Action::Analyze {
                            file: file.clone(),
                            profile: profiles[choice].clone(),
                        },
                        _ => Action::Reply(INVALID_CHOICE),
                    }
                }
                SessionState::Analyzing => Action::Reply(STILL_ANALYZING),
                _ if !body.is_empty() => Action::Reply(UPLOAD_PROMPT),
                _ => Action::Reply(FALLBACK),
            };
            if matches!(action, Action::Analyze { .. }) {
                *state = SessionState::Analyzing;
            }
            action
        });

        match action {
            Action::Reply(text) => text.to_string(),
            Action::Analyze { file, profile } => self.analyze(&phone, file, &profile).await,
        }
    }

    async fn receive_media(&self, phone: &str, url: &str, content_type: Option<&str>) -> String {
        let file = match self.save_media(url, content_type).await {
            Ok(file) => file,
            Err(e) => {
                tracing::error!("Media download from {} failed: {}", phone, e);
                return DOWNLOAD_FAILED.to_string();
            }
        };

        let previous = self.sessions.transition(phone, |state| {
            if *state == SessionState::Analyzing {
                return None;
            }
            Some(std::mem::replace(
                state,
                SessionState::AwaitingProfile { file: file.clone() },
            ))
        });

        match previous {
            None => {
                remove_media(&file).await;
                return STILL_ANALYZING.to_string();
            }
            Some(SessionState::AwaitingProfile { file: replaced }) => remove_media(&replaced).await,
            Some(_) => {}
        }

        tracing::info!("Prescription from {} saved to {}", phone, file.display());
        profile_prompt(&self.config.profiles_for(phone))
    }

    async fn save_media(&self, url: &str, content_type: Option<&str>) -> Result<PathBuf> {
        let data = self.media.fetch(url).await?;

        tokio::fs::create_dir_all(&self.config.upload_dir).await?;
        let path = self.config.upload_dir.join(format!(
            "{}.{}",
            Uuid::new_v4(),
            media_extension(content_type)
        ));
        tokio::fs::write(&path, &data).await?;

        // the API may run from another working directory
        Ok(tokio::fs::canonicalize(&path).await.unwrap_or(path))
    }

    async fn analyze(&self, phone: &str, file: PathBuf, profile: &str) -> String {
        tracing::info!("Analysing {} for {} (profile: {})", file.display(), phone, profile);

        let guard = AnalysisGuard::new(&self.sessions, phone, &file);
        let result = self.analyzer.analyze(&file, profile).await;
        guard.disarm();

        match result {
            Ok(summary) => {
                self.sessions.set(
                    phone,
                    SessionState::Completed {
                        summary: summary.clone(),
                    },
                );
                remove_media(&file).await;
                summary
            }
            Err(e) => {
                tracing::error!("Analysis failed for {}: {}", phone, e);
                self.sessions.set(phone, SessionState::AwaitingProfile { file });
                ANALYSIS_FAILED.to_string()
            }
        }
    }
}

/// Media is kept only until a successful analysis
async fn remove_media(file: &Path) {
    if let Err(e) = tokio::fs::remove_file(file).await {
        tracing::warn!("Failed to remove {}: {}", file.display(), e);
    }
}

/// Numbered profile list shown after an upload
pub fn profile_prompt(profiles: &[String]) -> String {
    let list = profiles
        .iter()
        .enumerate()
        .map(|(i, p)| format!("{}\u{fe0f}\u{20e3} {}", i + 1, p))
        .collect::<Vec<_>>()
        .join("\n");

    format!("📄 Prescription received!\n\nWhose prescription is this?\n{}", list)
}

/// Build the webhook router
pub fn router(bot: Arc<WhatsAppBot>) -> Router {
    Router::new()
        .route("/whatsapp", post(whatsapp_webhook))
        .route("/health", get(|| async { "OK" }))
        .with_state(bot)
        .layer(TraceLayer::new_for_http())
}

/// POST /whatsapp - Twilio webhook
async fn whatsapp_webhook(
    State(bot): State<Arc<WhatsAppBot>>,
    Form(message): Form<IncomingMessage>,
) -> impl IntoResponse {
    let reply = bot.handle(&message).await;
    (
        [(header::CONTENT_TYPE, TWIML_CONTENT_TYPE)],
        message_response(&reply),
    )
}
