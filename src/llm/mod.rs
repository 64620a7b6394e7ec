//! Completion client traits and implementations.
//!
//! The conversation session talks to the language model through the
//! [`CompletionClient`] trait: an ordered list of role/content messages goes
//! in, a single assistant reply comes out.
//!
//! # Clients
//!
//! - [`ChatCompletionsClient`]: OpenAI-compatible Chat Completions API
//!   (`/v1/chat/completions`), non-streaming.
//!
//! # Example
//!
//! ```rust,ignore
//! use chatmaven::llm::{ChatCompletionsClient, CompletionClient, Message};
//!
//! let client = ChatCompletionsClient::new(settings)?;
//! let reply = client
//!     .complete(&[Message::user("2+2?")], chatmaven::llm::COMPLETION_TEMPERATURE)
//!     .await?;
//! ```

pub mod chat_completions;
pub mod provider;

pub use chat_completions::ChatCompletionsClient;
pub use provider::Provider;

use std::time::Duration;

use crate::error::CompletionError;

/// Sampling temperature used for every completion request.
pub const COMPLETION_TEMPERATURE: f32 = 0.2;

/// Model used when `OPENAI_MODEL` is not set.
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Base URL used when `OPENAI_BASE_URL` is not set.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// API key for the completion service.
///
/// The value never appears in `Debug` output or logs.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wrap a key, rejecting absent or whitespace-only values.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            None
        } else {
            Some(Self(raw.trim().to_string()))
        }
    }

    /// The secret value, for building request headers.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Completion service connection and model settings.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    /// Base URL for the API (e.g., `https://api.openai.com`).
    pub base_url: String,
    /// Credential sent with every request.
    pub api_key: ApiKey,
    /// Model identifier (e.g., `gpt-3.5-turbo`).
    pub model: String,
    /// Provider flavour, detected from `base_url`.
    pub provider: Provider,
    /// Per-request timeout.
    pub timeout: Duration,
}

/// Role of a message author on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System directive.
    System,
    /// User message.
    User,
    /// Assistant response.
    Assistant,
}

/// A message in a completion request.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Message {
    /// Role of the message author.
    pub role: MessageRole,
    /// Text content.
    pub content: String,
}

impl Message {
    /// System directive message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    /// User message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    /// Assistant message.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// A service that turns a conversation into the next assistant reply.
///
/// Implementations do not retry; any failure is returned as-is.
#[async_trait::async_trait]
pub trait CompletionClient: Send + Sync {
    /// Request one assistant reply for the ordered `messages`.
    async fn complete(
        &self,
        messages: &[Message],
        temperature: f32,
    ) -> Result<String, CompletionError>;
}
