//! WhatsApp front end (Twilio webhook)
//!
//! Conversation: upload a prescription, pick whose it is, get the summary.

pub mod analyzer;
pub mod media;
pub mod session;
pub mod twiml;
pub mod webhook;

pub use analyzer::{HttpAnalyzer, PrescriptionAnalyzer};
pub use media::{media_extension, MediaFetcher, TwilioMediaClient};
pub use session::{SessionState, SessionStore};
pub use twiml::message_response;
pub use webhook::{router, IncomingMessage, WhatsAppBot};
