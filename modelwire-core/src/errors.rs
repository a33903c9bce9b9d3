//! Error types for modelwire.
//!
//! The canonical layer only fails for a handful of reasons: the caller handed
//! over something a provider cannot express, the provider answered with
//! something that violates its own protocol, or configuration is missing.
//! Each of those is a distinct type so callers can branch on kind.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// The main error type for modelwire core operations.
#[derive(Error, Debug)]
pub enum ModelwireError {
    /// Configuration error (missing model name, credentials, ...).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The caller supplied something the target provider cannot accept.
    #[error(transparent)]
    User(#[from] UserError),

    /// The provider response violated a structural assumption.
    #[error(transparent)]
    UnexpectedBehavior(#[from] UnexpectedModelBehavior),

    /// A provider requires a tool call id that the message does not carry.
    #[error(transparent)]
    MissingToolCallId(#[from] MissingToolCallId),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using ModelwireError.
pub type Result<T> = std::result::Result<T, ModelwireError>;

/// Error caused by how the library was used, e.g. an unsupported schema.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserError {
    /// Error message.
    pub message: String,
    /// Optional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl fmt::Display for UserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "User error: {}", self.message)
    }
}

impl UserError {
    /// Create a new user error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            details: None,
        }
    }

    /// Add details.
    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Unexpected behavior from the model.
#[derive(Error, Debug, Clone, PartialEq)]
pub struct UnexpectedModelBehavior {
    /// Description of the unexpected behavior.
    pub message: String,
    /// The raw response body that caused the issue, if any.
    pub body: Option<String>,
}

impl fmt::Display for UnexpectedModelBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unexpected model behavior: {}", self.message)?;
        if let Some(ref body) = self.body {
            write!(f, ", body:\n{}", body)?;
        }
        Ok(())
    }
}

impl UnexpectedModelBehavior {
    /// Create a new unexpected behavior error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            body: None,
        }
    }

    /// Attach the raw response body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// A message references a tool call without the id the provider needs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{provider} requires `tool_call_id` to be set on {kind} for tool `{tool_name}`")]
pub struct MissingToolCallId {
    /// Provider that requires the id.
    pub provider: String,
    /// Kind of the offending message or part.
    pub kind: String,
    /// Tool name on the offending message or part.
    pub tool_name: String,
}

impl MissingToolCallId {
    /// Create a new missing-id error.
    pub fn new(
        provider: impl Into<String>,
        kind: impl Into<String>,
        tool_name: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            kind: kind.into(),
            tool_name: tool_name.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_error_display() {
        let err = UserError::new("Recursive `$ref`s are not supported");
        assert_eq!(
            err.to_string(),
            "User error: Recursive `$ref`s are not supported"
        );
        assert!(err.details.is_none());
    }

    #[test]
    fn test_unexpected_behavior_with_body() {
        let err = UnexpectedModelBehavior::new("Unexpected response from gemini 500")
            .with_body("{\"error\": \"boom\"}");
        let text = err.to_string();
        assert!(text.starts_with("Unexpected model behavior: Unexpected response from gemini 500"));
        assert!(text.contains("boom"));
    }

    #[test]
    fn test_missing_tool_call_id_display() {
        let err = MissingToolCallId::new("OpenAI", "tool-return", "get_weather");
        assert_eq!(
            err.to_string(),
            "OpenAI requires `tool_call_id` to be set on tool-return for tool `get_weather`"
        );
    }

    #[test]
    fn test_conversion_into_main_error() {
        let err: ModelwireError = UserError::new("bad schema").into();
        assert!(matches!(err, ModelwireError::User(_)));

        let err: ModelwireError = UnexpectedModelBehavior::new("no candidates").into();
        assert!(matches!(err, ModelwireError::UnexpectedBehavior(_)));
    }
}
