//! Request message types.
//!
//! These are the messages sent TO the model: system prompts, user prompts,
//! tool returns, and retry prompts. Tool returns and retry prompts know how to
//! render themselves either as inline text or as a JSON object, since
//! providers disagree on which one they accept.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::role::UserRole;
use crate::identifier::now_utc;

/// System prompt message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemPrompt {
    /// The system prompt content.
    pub content: String,
    /// Role tag, always `user`.
    #[serde(default)]
    pub role: UserRole,
}

impl SystemPrompt {
    /// Message kind identifier.
    pub const MESSAGE_KIND: &'static str = "system-prompt";

    /// Create a new system prompt.
    #[must_use]
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            role: UserRole,
        }
    }
}

/// User prompt message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPrompt {
    /// The user's text.
    pub content: String,
    /// When the prompt was created.
    #[serde(default = "now_utc")]
    pub timestamp: DateTime<Utc>,
    /// Role tag, always `user`.
    #[serde(default)]
    pub role: UserRole,
}

impl UserPrompt {
    /// Message kind identifier.
    pub const MESSAGE_KIND: &'static str = "user-prompt";

    /// Create a new user prompt.
    #[must_use]
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            timestamp: now_utc(),
            role: UserRole,
        }
    }

    /// Set the timestamp.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Result of a tool call, sent back to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolReturn {
    /// Name of the tool that was called.
    pub tool_name: String,
    /// The return value, any JSON value.
    pub content: Value,
    /// Id of the call this answers, when the provider issued one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// When the tool returned.
    #[serde(default = "now_utc")]
    pub timestamp: DateTime<Utc>,
    /// Role tag, always `user`.
    #[serde(default)]
    pub role: UserRole,
}

impl ToolReturn {
    /// Message kind identifier.
    pub const MESSAGE_KIND: &'static str = "tool-return";

    /// Create a new tool return.
    #[must_use]
    pub fn new(tool_name: impl Into<String>, content: impl Into<Value>) -> Self {
        Self {
            tool_name: tool_name.into(),
            content: content.into(),
            tool_call_id: None,
            timestamp: now_utc(),
            role: UserRole,
        }
    }

    /// Set the tool call ID.
    #[must_use]
    pub fn with_tool_call_id(mut self, id: impl Into<String>) -> Self {
        self.tool_call_id = Some(id.into());
        self
    }

    /// Set the timestamp.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// The return value as text: strings as-is, anything else as compact JSON.
    #[must_use]
    pub fn model_response_str(&self) -> String {
        match &self.content {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    /// The return value as a JSON object.
    ///
    /// An object passes through; any other value is wrapped as
    /// `{"return_value": <content>}`.
    #[must_use]
    pub fn model_response_object(&self) -> Map<String, Value> {
        match &self.content {
            Value::Object(map) => map.clone(),
            other => {
                let mut map = Map::new();
                map.insert("return_value".to_string(), other.clone());
                map
            }
        }
    }
}

/// A location segment inside a validation error: a field name or a list index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LocItem {
    /// Field name.
    Key(String),
    /// List index.
    Index(u64),
}

impl From<&str> for LocItem {
    fn from(s: &str) -> Self {
        Self::Key(s.to_string())
    }
}

impl From<u64> for LocItem {
    fn from(i: u64) -> Self {
        Self::Index(i)
    }
}

/// One structured validation error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Machine-readable error type, e.g. `int_parsing`.
    #[serde(rename = "type")]
    pub error_type: String,
    /// Path to the offending value.
    pub loc: Vec<LocItem>,
    /// Human-readable message.
    pub msg: String,
    /// The offending input.
    #[serde(default)]
    pub input: Value,
    /// Extra context. Never included in prompts sent to a model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ctx: Option<Value>,
    /// Documentation link.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl ValidationErrorDetail {
    /// Create a new validation error record.
    #[must_use]
    pub fn new(
        error_type: impl Into<String>,
        loc: Vec<LocItem>,
        msg: impl Into<String>,
        input: impl Into<Value>,
    ) -> Self {
        Self {
            error_type: error_type.into(),
            loc,
            msg: msg.into(),
            input: input.into(),
            ctx: None,
            url: None,
        }
    }

    /// Set the context.
    #[must_use]
    pub fn with_ctx(mut self, ctx: Value) -> Self {
        self.ctx = Some(ctx);
        self
    }

    /// Set the documentation URL.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// Prompt rendering of a [`ValidationErrorDetail`], without `ctx`.
#[derive(Serialize)]
struct PromptErrorView<'a> {
    #[serde(rename = "type")]
    error_type: &'a str,
    loc: &'a [LocItem],
    msg: &'a str,
    input: &'a Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<&'a str>,
}

impl<'a> From<&'a ValidationErrorDetail> for PromptErrorView<'a> {
    fn from(detail: &'a ValidationErrorDetail) -> Self {
        Self {
            error_type: &detail.error_type,
            loc: &detail.loc,
            msg: &detail.msg,
            input: &detail.input,
            url: detail.url.as_deref(),
        }
    }
}

/// Content of a retry prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RetryContent {
    /// Free-text explanation.
    Text(String),
    /// Structured validation errors.
    Errors(Vec<ValidationErrorDetail>),
}

impl From<String> for RetryContent {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for RetryContent {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<Vec<ValidationErrorDetail>> for RetryContent {
    fn from(errors: Vec<ValidationErrorDetail>) -> Self {
        Self::Errors(errors)
    }
}

/// Message asking the model to try again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPrompt {
    /// Why the model should retry.
    pub content: RetryContent,
    /// Tool whose call failed, if the retry is about a tool call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    /// Id of the failed call, when the provider issued one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// When the retry was requested.
    #[serde(default = "now_utc")]
    pub timestamp: DateTime<Utc>,
    /// Role tag, always `user`.
    #[serde(default)]
    pub role: UserRole,
}

impl RetryPrompt {
    /// Message kind identifier.
    pub const MESSAGE_KIND: &'static str = "retry-prompt";

    /// Create a new retry prompt.
    #[must_use]
    pub fn new(content: impl Into<RetryContent>) -> Self {
        Self {
            content: content.into(),
            tool_name: None,
            tool_call_id: None,
            timestamp: now_utc(),
            role: UserRole,
        }
    }

    /// Set the tool name.
    #[must_use]
    pub fn with_tool_name(mut self, name: impl Into<String>) -> Self {
        self.tool_name = Some(name.into());
        self
    }

    /// Set the tool call ID.
    #[must_use]
    pub fn with_tool_call_id(mut self, id: impl Into<String>) -> Self {
        self.tool_call_id = Some(id.into());
        self
    }

    /// Set the timestamp.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Render the retry request as the text sent to the model.
    #[must_use]
    pub fn model_response(&self) -> String {
        let description = match &self.content {
            RetryContent::Text(text) => text.clone(),
            RetryContent::Errors(errors) => {
                let views: Vec<PromptErrorView<'_>> = errors.iter().map(Into::into).collect();
                let json = serde_json::to_string_pretty(&views).unwrap_or_default();
                format!("{} validation errors: {}", errors.len(), json)
            }
        };
        format!("{}\n\nFix the errors and try again.", description)
    }
}
