//! Per-number conversation state

use dashmap::DashMap;
use std::path::PathBuf;

/// Where a conversation stands
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    /// A file was received and we are waiting for the profile number
    AwaitingProfile { file: PathBuf },
    /// The analyzer is running
    Analyzing,
    /// Last analysis finished
    Completed { summary: String },
}

/// Sessions keyed by phone number, created on first contact
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: DashMap<String, SessionState>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state (Idle for unknown numbers)
    pub fn state(&self, phone_number: &str) -> SessionState {
        self.sessions
            .get(phone_number)
            .map(|s| s.value().clone())
            .unwrap_or_default()
    }

    pub fn set(&self, phone_number: &str, state: SessionState) {
        tracing::debug!("Session {} → {:?}", phone_number, state);
        self.sessions.insert(phone_number.to_string(), state);
    }

    /// Inspect and update a session atomically
    pub fn transition<R>(&self, phone_number: &str, f: impl FnOnce(&mut SessionState) -> R) -> R {
        let mut entry = self.sessions.entry(phone_number.to_string()).or_default();
        f(entry.value_mut())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sessions_created_idle() {
        let store = SessionStore::new();
        assert_eq!(store.state("+15550001"), SessionState::Idle);
        assert!(store.is_empty());

        let result = store.transition("+15550001", |state| {
            *state = SessionState::Analyzing;
            42
        });
        assert_eq!(result, 42);
        assert_eq!(store.state("+15550001"), SessionState::Analyzing);
        assert_eq!(store.state("+15550002"), SessionState::Idle);
        assert_eq!(store.len(), 1);
    }
}
