//! Error types for conversation sessions and the completion client.

use thiserror::Error;

/// Upper bound on how much of an error response body is kept.
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Failure reported by the completion service or the transport to it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompletionError {
    /// The service rejected the API key (HTTP 401/403).
    #[error("completion service rejected the credentials (HTTP {status})")]
    Auth {
        /// HTTP status code returned by the service.
        status: u16,
    },

    /// The service is throttling requests (HTTP 429).
    #[error("completion service rate limit exceeded")]
    RateLimited,

    /// No response arrived within the configured timeout.
    #[error("completion request timed out")]
    Timeout,

    /// Connection or transport failure.
    #[error("network error: {0}")]
    Network(String),

    /// Any other non-success HTTP status.
    #[error("completion service returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code returned by the service.
        status: u16,
        /// Response body, truncated.
        body: String,
    },

    /// The response could not be decoded or carried no assistant content.
    #[error("malformed completion response: {0}")]
    MalformedResponse(String),
}

impl CompletionError {
    /// Classify a non-success HTTP status returned by the service.
    #[must_use]
    pub fn from_status(status: u16, body: &str) -> Self {
        match status {
            401 | 403 => Self::Auth { status },
            429 => Self::RateLimited,
            _ => Self::Status {
                status,
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            },
        }
    }
}

impl From<reqwest::Error> for CompletionError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::MalformedResponse(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// Errors surfaced by session operations and start-up.
#[derive(Debug, Error)]
pub enum ChatError {
    /// `OPENAI_API_KEY` is absent or blank. Fatal at start-up.
    #[error("OPENAI_API_KEY is not set")]
    MissingCredential,

    /// A start-up setting other than the credential is unusable.
    #[error("invalid setting {name}: {reason}")]
    InvalidSetting {
        /// Environment variable name.
        name: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// The submitted text is empty after trimming whitespace.
    #[error("message is empty")]
    EmptyInput,

    /// Another submission for the same session is still awaiting its reply.
    #[error("a previous message is still awaiting a response")]
    SubmissionPending,

    /// No live session has the given id.
    #[error("session {0} not found")]
    SessionNotFound(String),

    /// The completion call failed; the user turn stays in the transcript.
    #[error("completion request failed: {0}")]
    CompletionRequestFailure(#[from] CompletionError),
}

impl ChatError {
    /// Stable machine-readable code for API responses.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingCredential => "missing_credential",
            Self::InvalidSetting { .. } => "invalid_setting",
            Self::EmptyInput => "empty_input",
            Self::SubmissionPending => "submission_pending",
            Self::SessionNotFound(_) => "session_not_found",
            Self::CompletionRequestFailure(CompletionError::RateLimited) => "rate_limited",
            Self::CompletionRequestFailure(_) => "completion_failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(
            CompletionError::from_status(401, ""),
            CompletionError::Auth { status: 401 }
        );
        assert_eq!(
            CompletionError::from_status(403, "forbidden"),
            CompletionError::Auth { status: 403 }
        );
        assert_eq!(
            CompletionError::from_status(429, "slow down"),
            CompletionError::RateLimited
        );
        assert!(matches!(
            CompletionError::from_status(500, "boom"),
            CompletionError::Status { status: 500, .. }
        ));
    }

    #[test]
    fn test_status_body_truncated() {
        let body = "x".repeat(2_000);
        let CompletionError::Status { body, .. } = CompletionError::from_status(502, &body) else {
            panic!("expected Status variant");
        };
        assert_eq!(body.len(), MAX_ERROR_BODY_CHARS);
    }

    #[test]
    fn test_codes() {
        assert_eq!(ChatError::EmptyInput.code(), "empty_input");
        assert_eq!(
            ChatError::from(CompletionError::RateLimited).code(),
            "rate_limited"
        );
        assert_eq!(
            ChatError::from(CompletionError::Timeout).code(),
            "completion_failed"
        );
    }
}
