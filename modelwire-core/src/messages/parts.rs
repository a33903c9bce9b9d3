//! Response part types.
//!
//! A model response is an ordered list of parts, each either free text or a
//! tool call. Tool call arguments keep whichever representation the provider
//! produced: a raw JSON string (streamed incrementally by some providers) or an
//! already-parsed mapping.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::UserError;

/// Text content part.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextPart {
    /// The text content.
    pub content: String,
}

impl TextPart {
    /// Part kind identifier.
    pub const PART_KIND: &'static str = "text";

    /// Create a new text part.
    #[must_use]
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }

    /// Get the part kind.
    #[must_use]
    pub fn part_kind(&self) -> &'static str {
        Self::PART_KIND
    }

    /// Check if the content is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

impl From<String> for TextPart {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for TextPart {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Tool call arguments, in the representation the provider supplied.
///
/// Serializes as `{"args_json": "..."}` or `{"args_dict": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ToolCallArgs {
    /// Raw JSON text, possibly assembled from streamed fragments.
    #[serde(rename = "args_json")]
    Json(String),
    /// Parsed key/value mapping.
    #[serde(rename = "args_dict")]
    Dict(Map<String, Value>),
}

impl ToolCallArgs {
    /// Create arguments from a raw JSON string.
    #[must_use]
    pub fn json(args_json: impl Into<String>) -> Self {
        Self::Json(args_json.into())
    }

    /// Create arguments from a mapping.
    #[must_use]
    pub fn dict(args_dict: Map<String, Value>) -> Self {
        Self::Dict(args_dict)
    }

    /// Render the arguments as a JSON string.
    ///
    /// Raw JSON is returned untouched; a mapping is serialized compactly.
    #[must_use]
    pub fn to_json_string(&self) -> String {
        match self {
            Self::Json(s) => s.clone(),
            Self::Dict(map) => Value::Object(map.clone()).to_string(),
        }
    }

    /// Get the arguments as a mapping, parsing raw JSON if needed.
    pub fn to_dict(&self) -> Result<Map<String, Value>, UserError> {
        match self {
            Self::Dict(map) => Ok(map.clone()),
            Self::Json(s) => match serde_json::from_str::<Value>(s) {
                Ok(Value::Object(map)) => Ok(map),
                Ok(other) => Err(UserError::new(format!(
                    "Tool call arguments must be a JSON object, got: {}",
                    other
                ))),
                Err(e) => Err(UserError::new(format!(
                    "Tool call arguments are not valid JSON: {}",
                    e
                ))),
            },
        }
    }

    /// Whether the arguments carry anything meaningful.
    ///
    /// A mapping has content if any value is truthy; raw JSON if it is non-empty.
    #[must_use]
    pub fn has_content(&self) -> bool {
        match self {
            Self::Dict(map) => map.values().any(is_truthy),
            Self::Json(s) => !s.is_empty(),
        }
    }
}

impl From<Map<String, Value>> for ToolCallArgs {
    fn from(map: Map<String, Value>) -> Self {
        Self::Dict(map)
    }
}

impl From<String> for ToolCallArgs {
    fn from(s: String) -> Self {
        Self::Json(s)
    }
}

impl From<&str> for ToolCallArgs {
    fn from(s: &str) -> Self {
        Self::Json(s.to_string())
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Tool call part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallPart {
    /// Name of the tool to call.
    pub tool_name: String,
    /// Arguments for the call.
    pub args: ToolCallArgs,
    /// Provider-assigned call id, absent for providers that do not issue one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ToolCallPart {
    /// Part kind identifier.
    pub const PART_KIND: &'static str = "tool-call";

    /// Create a new tool call part.
    #[must_use]
    pub fn new(tool_name: impl Into<String>, args: impl Into<ToolCallArgs>) -> Self {
        Self {
            tool_name: tool_name.into(),
            args: args.into(),
            tool_call_id: None,
        }
    }

    /// Create a tool call from raw JSON arguments.
    #[must_use]
    pub fn from_json(
        tool_name: impl Into<String>,
        args_json: impl Into<String>,
        tool_call_id: Option<String>,
    ) -> Self {
        Self {
            tool_name: tool_name.into(),
            args: ToolCallArgs::Json(args_json.into()),
            tool_call_id,
        }
    }

    /// Create a tool call from an argument mapping.
    #[must_use]
    pub fn from_dict(
        tool_name: impl Into<String>,
        args_dict: Map<String, Value>,
        tool_call_id: Option<String>,
    ) -> Self {
        Self {
            tool_name: tool_name.into(),
            args: ToolCallArgs::Dict(args_dict),
            tool_call_id,
        }
    }

    /// Set the tool call ID.
    #[must_use]
    pub fn with_tool_call_id(mut self, id: impl Into<String>) -> Self {
        self.tool_call_id = Some(id.into());
        self
    }

    /// Get the part kind.
    #[must_use]
    pub fn part_kind(&self) -> &'static str {
        Self::PART_KIND
    }

    /// Whether the call carries any argument content.
    #[must_use]
    pub fn has_content(&self) -> bool {
        self.args.has_content()
    }
}
