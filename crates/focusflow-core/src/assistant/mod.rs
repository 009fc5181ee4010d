//! AI study assistant backed by a chat-completion API.

mod openai;

pub use openai::OpenAiAssistant;

use async_trait::async_trait;
use tracing::warn;

use crate::error::{GatewayError, Result};
use crate::storage::AssistantConfig;

/// Keyring entry holding the API key.
pub const API_KEY_ENTRY: &str = "openai_api_key";

/// Environment variable consulted when the config has no key.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

pub const SYSTEM_PROMPT: &str = "You are an AI Study Assistant for FocusFlow, a productivity app for students. Your role is to:

1. Help students with academic subjects (math, science, history, literature, etc.)
2. Provide effective study strategies and techniques
3. Explain complex concepts in simple terms
4. Offer time management and productivity advice
5. Encourage good study habits and learning practices

Keep responses helpful, educational, and encouraging. Use clear, concise language. If asked about non-academic topics, gently redirect to study-related subjects.";

/// Reply used when the service answers without any choices.
pub const FALLBACK_REPLY: &str = "Sorry, I couldn't generate a response. Please try again.";

#[async_trait]
pub trait ChatAssistant {
    /// Ask one question and get the assistant's reply.
    async fn ask(&self, message: &str) -> Result<String>;
}

/// Find an API key: config first, then the environment, then the OS keyring.
pub fn resolve_api_key(config: &AssistantConfig) -> Result<String> {
    if let Some(key) = config.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
        return Ok(key.trim().to_string());
    }
    if let Ok(key) = std::env::var(API_KEY_ENV) {
        if !key.trim().is_empty() {
            return Ok(key.trim().to_string());
        }
    }
    match keyring_store::get(API_KEY_ENTRY) {
        Ok(Some(key)) => Ok(key),
        Ok(None) => Err(GatewayError::MissingApiKey.into()),
        Err(e) => {
            warn!(error = %e, "keyring lookup failed");
            Err(GatewayError::MissingApiKey.into())
        }
    }
}

/// Thin wrapper around the OS keyring for credential storage.
pub mod keyring_store {
    use crate::error::GatewayError;

    const SERVICE: &str = "focusflow";

    pub fn get(key: &str) -> Result<Option<String>, GatewayError> {
        let entry = keyring::Entry::new(SERVICE, key)?;
        match entry.get_password() {
            Ok(pw) => Ok(Some(pw)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn set(key: &str, value: &str) -> Result<(), GatewayError> {
        let entry = keyring::Entry::new(SERVICE, key)?;
        entry.set_password(value)?;
        Ok(())
    }

    pub fn delete(key: &str) -> Result<(), GatewayError> {
        let entry = keyring::Entry::new(SERVICE, key)?;
        match entry.delete_credential() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
