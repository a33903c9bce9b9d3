//! Streaming errors.

use thiserror::Error;

/// Errors that can occur while decoding a streamed body.
#[derive(Debug, Error)]
pub enum StreamError {
    /// Malformed JSON that cannot be a prefix of a valid document.
    #[error("Partial JSON error at byte {offset}: {message}")]
    PartialJson {
        /// Byte offset of the offending input.
        offset: usize,
        /// What went wrong.
        message: String,
    },

    /// Parse error for SSE event.
    #[error("Failed to parse SSE event: {0}")]
    ParseSse(String),

    /// JSON parse error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Buffered data exceeded the configured limit.
    #[error("Stream buffer exceeded {limit} bytes")]
    BufferOverflow {
        /// The configured limit.
        limit: usize,
    },

    /// Connection closed unexpectedly.
    #[error("Connection closed unexpectedly")]
    ConnectionClosed,

    /// Other error.
    #[error("{0}")]
    Other(String),
}

impl StreamError {
    /// Create a partial JSON error.
    pub fn partial_json(offset: usize, message: impl Into<String>) -> Self {
        Self::PartialJson {
            offset,
            message: message.into(),
        }
    }

    /// Create from any error.
    pub fn from_err<E: std::fmt::Display>(err: E) -> Self {
        Self::Other(err.to_string())
    }
}

/// Result type for streaming operations.
pub type StreamResult<T> = Result<T, StreamError>;
