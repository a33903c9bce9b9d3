//! Model-related error types.

use modelwire_core::{MissingToolCallId, ModelwireError, UnexpectedModelBehavior, UserError};
use modelwire_streaming::StreamError;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Model-related errors.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Missing model name, credentials or other required configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The caller asked for something the provider cannot express.
    #[error(transparent)]
    User(#[from] UserError),

    /// The provider broke one of its own protocol assumptions.
    #[error(transparent)]
    UnexpectedBehavior(#[from] UnexpectedModelBehavior),

    /// A message lacks the tool call id the provider requires.
    #[error(transparent)]
    MissingToolCallId(#[from] MissingToolCallId),

    /// HTTP error from the API. The body has been read in full.
    #[error("HTTP error: {status} - {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
        /// Response headers.
        headers: HashMap<String, String>,
    },

    /// API-level error.
    #[error("API error: {message}")]
    Api {
        /// Error message.
        message: String,
        /// Error code.
        code: Option<String>,
    },

    /// Request timeout.
    #[error("Request timeout after {0:?}")]
    Timeout(Duration),

    /// Rate limited by the API.
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited {
        /// Suggested retry delay.
        retry_after: Option<Duration>,
    },

    /// Authentication failed.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Connection error.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Failure while decoding a streamed body.
    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),

    /// JSON serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Other error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ModelError {
    /// Check if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            ModelError::Timeout(_) => true,
            ModelError::RateLimited { .. } => true,
            ModelError::Connection(_) => true,
            ModelError::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Get the retry-after duration if applicable.
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ModelError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }

    /// Create an API error.
    pub fn api(message: impl Into<String>) -> Self {
        Self::Api {
            message: message.into(),
            code: None,
        }
    }

    /// Create an API error with code.
    pub fn api_with_code(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self::Api {
            message: message.into(),
            code: Some(code.into()),
        }
    }

    /// Create a rate limited error.
    pub fn rate_limited(retry_after: Option<Duration>) -> Self {
        Self::RateLimited { retry_after }
    }

    /// Create an HTTP error.
    pub fn http(status: u16, body: impl Into<String>) -> Self {
        Self::Http {
            status,
            body: body.into(),
            headers: HashMap::new(),
        }
    }

    /// Create an HTTP error with headers.
    pub fn http_with_headers(
        status: u16,
        body: impl Into<String>,
        headers: HashMap<String, String>,
    ) -> Self {
        Self::Http {
            status,
            body: body.into(),
            headers,
        }
    }

    /// Create an authentication error.
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Authentication(message.into())
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create an unexpected-behavior error.
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::UnexpectedBehavior(UnexpectedModelBehavior::new(message))
    }

    /// Create an unexpected-behavior error carrying the offending body.
    pub fn unexpected_with_body(message: impl Into<String>, body: impl Into<String>) -> Self {
        Self::UnexpectedBehavior(UnexpectedModelBehavior::new(message).with_body(body))
    }
}

impl From<ModelwireError> for ModelError {
    fn from(err: ModelwireError) -> Self {
        match err {
            ModelwireError::Configuration(message) => Self::Configuration(message),
            ModelwireError::User(e) => Self::User(e),
            ModelwireError::UnexpectedBehavior(e) => Self::UnexpectedBehavior(e),
            ModelwireError::MissingToolCallId(e) => Self::MissingToolCallId(e),
            ModelwireError::Serialization(e) => Self::Serialization(e),
        }
    }
}

impl From<reqwest::Error> for ModelError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ModelError::Timeout(Duration::from_secs(30)) // Default timeout
        } else if err.is_connect() {
            ModelError::Connection(err.to_string())
        } else if let Some(status) = err.status() {
            ModelError::Http {
                status: status.as_u16(),
                body: err.to_string(),
                headers: HashMap::new(),
            }
        } else {
            ModelError::Other(err.into())
        }
    }
}

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_retryable() {
        assert!(ModelError::Timeout(Duration::from_secs(30)).is_retryable());
        assert!(ModelError::rate_limited(None).is_retryable());
        assert!(ModelError::Connection("failed".into()).is_retryable());
        assert!(ModelError::http(500, "Server error").is_retryable());
        assert!(ModelError::http(502, "Bad gateway").is_retryable());

        assert!(!ModelError::http(400, "Bad request").is_retryable());
        assert!(!ModelError::auth("Invalid key").is_retryable());
        assert!(!ModelError::api("Error").is_retryable());
        assert!(!ModelError::unexpected("two candidates").is_retryable());
        assert!(!ModelError::configuration("no key").is_retryable());
    }

    #[test]
    fn test_retry_after() {
        let err = ModelError::rate_limited(Some(Duration::from_secs(60)));
        assert_eq!(err.retry_after(), Some(Duration::from_secs(60)));
        assert_eq!(ModelError::rate_limited(None).retry_after(), None);
    }

    #[test]
    fn test_from_core_error() {
        let err: ModelError = ModelwireError::User(UserError::new("bad schema")).into();
        assert!(matches!(err, ModelError::User(ref e) if e.message == "bad schema"));

        let err: ModelError = ModelwireError::Configuration("missing".into()).into();
        assert!(matches!(err, ModelError::Configuration(_)));

        let err: ModelError = MissingToolCallId::new("OpenAI", "tool-return", "f").into();
        assert_eq!(
            err.to_string(),
            "OpenAI requires `tool_call_id` to be set on tool-return for tool `f`"
        );
    }

    #[test]
    fn test_error_display() {
        let err = ModelError::api_with_code("Something went wrong", "INVALID_REQUEST");
        assert!(err.to_string().contains("Something went wrong"));

        let err = ModelError::http(404, "Not found");
        assert!(err.to_string().contains("404"));

        let err = ModelError::unexpected_with_body("Unexpected response from gemini 500", "boom");
        assert_eq!(
            err.to_string(),
            "Unexpected model behavior: Unexpected response from gemini 500, body:\nboom"
        );
    }
}
