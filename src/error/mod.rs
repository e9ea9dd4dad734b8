//! Error types for weave.

pub mod unified;

pub use unified::{ErrorCategory, RecoverySuggestion};

use thiserror::Error;

/// Primary error type for all weave operations.
#[derive(Error, Debug)]
pub enum WeaveError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("API error (status {status}): {message}")]
    Api {
        status: u16,
        message: String,
        /// Server-provided error payload, when the body was JSON.
        details: Option<serde_json::Value>,
    },

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Stream protocol error: {message} (line: {line})")]
    StreamProtocol { line: String, message: String },

    #[error("Tool execution error: {tool_name}: {message}")]
    ToolExecution { tool_name: String, message: String },

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Operation canceled")]
    Canceled,

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl WeaveError {
    /// Create an API status error without a detail payload.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
            details: None,
        }
    }

    /// Create an API status error from a raw response body.
    ///
    /// JSON bodies are kept as the structured detail payload.
    pub fn from_status(status: u16, body: &str) -> Self {
        let details = serde_json::from_str::<serde_json::Value>(body).ok();
        let message = details
            .as_ref()
            .and_then(|v| {
                v.get("error")
                    .and_then(|e| e.get("message").or(Some(e)))
                    .and_then(|m| m.as_str())
                    .map(ToString::to_string)
            })
            .unwrap_or_else(|| body.to_string());
        Self::Api {
            status,
            message,
            details,
        }
    }

    pub(crate) fn stream_protocol(line: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StreamProtocol {
            line: line.into(),
            message: message.into(),
        }
    }

    /// HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation(_) => ErrorCategory::Validation,
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::Authentication(_) => ErrorCategory::Authentication,
            Self::Network(_) | Self::Io(_) => ErrorCategory::Network,
            Self::Timeout(_) => ErrorCategory::Timeout,
            Self::Serialization(_) => ErrorCategory::Serialization,
            Self::StreamProtocol { .. } => ErrorCategory::StreamProtocol,
            Self::ToolExecution { .. } => ErrorCategory::ToolExecution,
            Self::Api { status, .. } => match status {
                401 | 403 => ErrorCategory::Authentication,
                429 => ErrorCategory::RateLimit,
                400..=499 => ErrorCategory::BadRequest,
                500..=599 => ErrorCategory::Server,
                _ => ErrorCategory::Unknown,
            },
            Self::Canceled | Self::InvalidState(_) => ErrorCategory::Unknown,
        }
    }

    /// Whether this error is potentially retryable by the caller.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::RateLimit
                | ErrorCategory::Network
                | ErrorCategory::Timeout
                | ErrorCategory::Server
        )
    }

    /// Suggest recovery actions.
    pub fn recovery_suggestion(&self) -> RecoverySuggestion {
        match self.category() {
            ErrorCategory::Authentication => RecoverySuggestion::CheckCredentials,
            ErrorCategory::RateLimit
            | ErrorCategory::Network
            | ErrorCategory::Server => RecoverySuggestion::RetryWithBackoff,
            ErrorCategory::Timeout => RecoverySuggestion::IncreaseTimeout,
            ErrorCategory::Configuration => RecoverySuggestion::CheckConfiguration,
            ErrorCategory::Validation | ErrorCategory::BadRequest => {
                RecoverySuggestion::FixRequest
            }
            ErrorCategory::ToolExecution => RecoverySuggestion::CheckToolImplementation,
            _ => RecoverySuggestion::ContactSupport,
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, WeaveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_status_extracts_nested_error_message() {
        let err = WeaveError::from_status(429, r#"{"error":{"message":"slow down"}}"#);
        assert_eq!(err.to_string(), "API error (status 429): slow down");
        assert_eq!(err.category(), ErrorCategory::RateLimit);
        assert!(err.is_retryable());
        assert!(matches!(err, WeaveError::Api { details: Some(_), .. }));
    }

    #[test]
    fn from_status_keeps_plain_text_bodies() {
        let err = WeaveError::from_status(400, "bad things");
        assert_eq!(err.category(), ErrorCategory::BadRequest);
        assert!(matches!(err, WeaveError::Api { details: None, ref message, .. } if message == "bad things"));
        assert_eq!(err.recovery_suggestion(), RecoverySuggestion::FixRequest);
    }

    #[test]
    fn auth_statuses_map_to_authentication() {
        assert_eq!(
            WeaveError::api(401, "nope").category(),
            ErrorCategory::Authentication
        );
        assert_eq!(
            WeaveError::api(403, "nope").recovery_suggestion(),
            RecoverySuggestion::CheckCredentials
        );
    }
}
