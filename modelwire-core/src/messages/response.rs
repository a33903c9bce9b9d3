//! Response message types.
//!
//! A [`ModelResponse`] is what a model produced for one exchange: an ordered
//! sequence of text and tool-call parts plus the time it was produced.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::parts::{TextPart, ToolCallArgs, ToolCallPart};
use super::role::ModelRole;
use crate::identifier::now_utc;

/// Individual part of a model response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "part_kind", rename_all = "kebab-case")]
pub enum ModelResponsePart {
    /// Text content.
    Text(TextPart),
    /// Tool call request.
    ToolCall(ToolCallPart),
}

impl ModelResponsePart {
    /// Create a text part.
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text(TextPart::new(content))
    }

    /// Create a tool call part.
    #[must_use]
    pub fn tool_call(tool_name: impl Into<String>, args: impl Into<ToolCallArgs>) -> Self {
        Self::ToolCall(ToolCallPart::new(tool_name, args))
    }

    /// Get the part kind.
    #[must_use]
    pub fn part_kind(&self) -> &'static str {
        match self {
            Self::Text(_) => TextPart::PART_KIND,
            Self::ToolCall(_) => ToolCallPart::PART_KIND,
        }
    }
}

impl From<TextPart> for ModelResponsePart {
    fn from(part: TextPart) -> Self {
        Self::Text(part)
    }
}

impl From<ToolCallPart> for ModelResponsePart {
    fn from(part: ToolCallPart) -> Self {
        Self::ToolCall(part)
    }
}

/// A complete response from a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelResponse {
    /// The response parts, in the order the model produced them.
    pub parts: Vec<ModelResponsePart>,
    /// When the response was produced.
    #[serde(default = "now_utc")]
    pub timestamp: DateTime<Utc>,
    /// Role tag, always `model`.
    #[serde(default)]
    pub role: ModelRole,
}

impl ModelResponse {
    /// Message kind identifier.
    pub const MESSAGE_KIND: &'static str = "model-response";

    /// Create a new response with the given parts, timestamped now.
    #[must_use]
    pub fn new(parts: Vec<ModelResponsePart>) -> Self {
        Self {
            parts,
            timestamp: now_utc(),
            role: ModelRole,
        }
    }

    /// Create a response holding a single text part.
    #[must_use]
    pub fn from_text(content: impl Into<String>) -> Self {
        Self::new(vec![ModelResponsePart::text(content)])
    }

    /// Create a response holding a single tool call.
    #[must_use]
    pub fn from_tool_call(call: ToolCallPart) -> Self {
        Self::new(vec![ModelResponsePart::ToolCall(call)])
    }

    /// Set the timestamp.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Iterate over text parts.
    pub fn text_parts(&self) -> impl Iterator<Item = &TextPart> {
        self.parts.iter().filter_map(|p| match p {
            ModelResponsePart::Text(t) => Some(t),
            _ => None,
        })
    }

    /// Iterate over tool call parts.
    pub fn tool_call_parts(&self) -> impl Iterator<Item = &ToolCallPart> {
        self.parts.iter().filter_map(|p| match p {
            ModelResponsePart::ToolCall(t) => Some(t),
            _ => None,
        })
    }

    /// Concatenated text content.
    #[must_use]
    pub fn text_content(&self) -> String {
        self.text_parts().map(|p| p.content.as_str()).collect()
    }

    /// Check if there are any tool calls.
    #[must_use]
    pub fn has_tool_calls(&self) -> bool {
        self.tool_call_parts().next().is_some()
    }

    /// Check if the response has no parts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}
