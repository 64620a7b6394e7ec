//! Transcript entries.

use serde::{Deserialize, Serialize};

use crate::llm::{Message, MessageRole};

/// One entry in a transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Turn {
    /// Instruction that seeds the conversation. Never shown to the user.
    SystemDirective(String),
    /// Text the user submitted.
    UserUtterance(String),
    /// Reply produced by the completion service.
    AssistantUtterance(String),
}

impl Turn {
    /// Text content of the turn.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::SystemDirective(text)
            | Self::UserUtterance(text)
            | Self::AssistantUtterance(text) => text,
        }
    }

    /// Wire role used when sending the turn to the completion service.
    #[must_use]
    pub fn role(&self) -> MessageRole {
        match self {
            Self::SystemDirective(_) => MessageRole::System,
            Self::UserUtterance(_) => MessageRole::User,
            Self::AssistantUtterance(_) => MessageRole::Assistant,
        }
    }

    /// Who is shown as the author of this turn, if it is shown at all.
    #[must_use]
    pub fn speaker(&self) -> Option<Speaker> {
        match self {
            Self::SystemDirective(_) => None,
            Self::UserUtterance(_) => Some(Speaker::User),
            Self::AssistantUtterance(_) => Some(Speaker::Assistant),
        }
    }
}

impl From<&Turn> for Message {
    fn from(turn: &Turn) -> Self {
        Self {
            role: turn.role(),
            content: turn.text().to_string(),
        }
    }
}

/// Author of a rendered transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    /// The person using the chat.
    User,
    /// ChatMaven.
    Assistant,
}

impl Speaker {
    /// Lowercase label, matching the wire role name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Speaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Owned `(speaker, text)` pair handed to the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewEntry {
    /// Author of the entry.
    #[serde(rename = "role")]
    pub speaker: Speaker,
    /// Text content.
    #[serde(rename = "content")]
    pub text: String,
}
