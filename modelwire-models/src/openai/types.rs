//! OpenAI API types.
//!
//! This module contains the request/response types for the OpenAI chat
//! completions API.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::time::Duration;

// ============================================================================
// Request Types
// ============================================================================

/// Chat completion request.
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    /// Model to use.
    pub model: String,
    /// Messages in the conversation.
    pub messages: Vec<ChatMessage>,
    /// Number of choices to generate.
    pub n: u32,
    /// Whether to allow parallel tool calls.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallel_tool_calls: Option<bool>,
    /// Tool definitions.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ChatTool>,
    /// Tool choice strategy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,
    /// Whether to stream the response.
    pub stream: bool,
    /// Stream options.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_options: Option<StreamOptions>,
    /// Maximum tokens to generate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u64>,
    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Nucleus sampling parameter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    /// Per-request deadline, handed to the transport.
    #[serde(skip)]
    pub timeout: Option<Duration>,
}

impl ChatCompletionRequest {
    /// Create a new request.
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            n: 1,
            parallel_tool_calls: None,
            tools: Vec::new(),
            tool_choice: None,
            stream: false,
            stream_options: None,
            max_tokens: None,
            temperature: None,
            top_p: None,
            timeout: None,
        }
    }
}

/// Role of a chat message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// System instructions.
    System,
    /// User input.
    User,
    /// Model output.
    Assistant,
    /// Tool result.
    Tool,
}

/// Chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message author.
    pub role: ChatRole,
    /// Message content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Tool calls made by the assistant.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// ID of the tool call being responded to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    fn with_role(role: ChatRole, content: Option<String>) -> Self {
        Self {
            role,
            content,
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(ChatRole::System, Some(content.into()))
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(ChatRole::User, Some(content.into()))
    }

    /// Create an assistant message.
    pub fn assistant(content: Option<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls,
            ..Self::with_role(ChatRole::Assistant, content)
        }
    }

    /// Create a tool response message.
    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            ..Self::with_role(ChatRole::Tool, Some(content.into()))
        }
    }
}

/// Tool definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTool {
    /// Tool type (always "function").
    #[serde(rename = "type")]
    pub tool_type: String,
    /// Function definition.
    pub function: FunctionDefinition,
}

impl ChatTool {
    /// Create a function tool.
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: JsonValue,
    ) -> Self {
        Self {
            tool_type: "function".to_string(),
            function: FunctionDefinition {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }
}

/// Function definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    /// Function name.
    pub name: String,
    /// Function description.
    pub description: String,
    /// Parameter schema.
    pub parameters: JsonValue,
}

/// Tool call in a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool call ID.
    pub id: String,
    /// Tool type.
    #[serde(rename = "type", default = "function_type")]
    pub tool_type: String,
    /// Function call details.
    pub function: FunctionCall,
}

impl ToolCall {
    /// Create a function tool call.
    pub fn function(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            tool_type: function_type(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }
}

fn function_type() -> String {
    "function".to_string()
}

/// Function call details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Function name.
    pub name: String,
    /// Arguments as JSON string.
    pub arguments: String,
}

/// Tool choice value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolChoice {
    /// Model decides whether to call tools.
    Auto,
    /// Model must call at least one tool.
    Required,
    /// Model should not call any tools.
    None,
}

/// Stream options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamOptions {
    /// Include usage in stream.
    pub include_usage: bool,
}

// ============================================================================
// Response Types
// ============================================================================

/// Why the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Natural stop or stop sequence.
    Stop,
    /// Token limit reached.
    Length,
    /// The model called tools.
    ToolCalls,
    /// Content was filtered.
    ContentFilter,
    /// Legacy function call.
    FunctionCall,
    /// Any value this crate does not know.
    #[serde(other)]
    Other,
}

/// Chat completion response.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    /// Response ID.
    #[serde(default)]
    pub id: String,
    /// Creation timestamp, Unix seconds.
    pub created: i64,
    /// Model used.
    #[serde(default)]
    pub model: String,
    /// Response choices.
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
    /// Token usage.
    pub usage: Option<Usage>,
}

/// Chat choice.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    /// Choice index.
    #[serde(default)]
    pub index: u32,
    /// The message.
    pub message: ResponseMessage,
    /// Reason for stopping.
    pub finish_reason: Option<FinishReason>,
}

/// Response message.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseMessage {
    /// Role.
    #[serde(default)]
    pub role: Option<String>,
    /// Text content.
    pub content: Option<String>,
    /// Tool calls.
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCall>>,
}

/// Token usage.
///
/// Detail objects are kept as raw maps so counters this crate does not
/// know about still reach the cost record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Usage {
    /// Prompt tokens.
    #[serde(default)]
    pub prompt_tokens: u64,
    /// Completion tokens.
    #[serde(default)]
    pub completion_tokens: u64,
    /// Total tokens.
    #[serde(default)]
    pub total_tokens: u64,
    /// Prompt token details (`cached_tokens`, `audio_tokens`, ...).
    pub prompt_tokens_details: Option<Map<String, JsonValue>>,
    /// Completion token details (`reasoning_tokens`, `audio_tokens`, ...).
    pub completion_tokens_details: Option<Map<String, JsonValue>>,
}

// ============================================================================
// Streaming Types
// ============================================================================

/// Chat completion chunk (streaming).
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionChunk {
    /// Response ID.
    #[serde(default)]
    pub id: String,
    /// Creation timestamp, Unix seconds.
    pub created: i64,
    /// Model used.
    #[serde(default)]
    pub model: String,
    /// Response choices.
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
    /// Token usage (if stream_options.include_usage is true).
    pub usage: Option<Usage>,
}

/// Chunk choice.
#[derive(Debug, Clone, Deserialize)]
pub struct ChunkChoice {
    /// Choice index.
    #[serde(default)]
    pub index: u32,
    /// Delta content.
    #[serde(default)]
    pub delta: ChunkDelta,
    /// Finish reason.
    pub finish_reason: Option<FinishReason>,
}

/// Chunk delta.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ChunkDelta {
    /// Role (usually only in first chunk).
    pub role: Option<String>,
    /// Text content delta.
    pub content: Option<String>,
    /// Tool calls delta.
    pub tool_calls: Option<Vec<ChunkToolCall>>,
}

/// Chunk tool call.
#[derive(Debug, Clone, Deserialize)]
pub struct ChunkToolCall {
    /// Index of this tool call.
    pub index: u32,
    /// Tool call ID (only in first chunk for this tool).
    pub id: Option<String>,
    /// Function call delta.
    pub function: Option<ChunkFunction>,
}

/// Chunk function.
#[derive(Debug, Clone, Deserialize)]
pub struct ChunkFunction {
    /// Function name fragment.
    pub name: Option<String>,
    /// Arguments fragment.
    pub arguments: Option<String>,
}

// ============================================================================
// Error Types
// ============================================================================

/// OpenAI API error response.
#[derive(Debug, Clone, Deserialize)]
pub struct OpenAIError {
    /// Error details.
    pub error: OpenAIErrorBody,
}

/// OpenAI error body.
#[derive(Debug, Clone, Deserialize)]
pub struct OpenAIErrorBody {
    /// Error message.
    pub message: String,
    /// Error type.
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,
    /// Error code.
    #[serde(default)]
    pub code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_minimal_request_omits_unset_fields() {
        let request = ChatCompletionRequest::new("gpt-4o", vec![ChatMessage::user("Hi")]);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            json!({
                "model": "gpt-4o",
                "messages": [{"role": "user", "content": "Hi"}],
                "n": 1,
                "stream": false
            })
        );
    }

    #[test]
    fn test_timeout_not_serialized() {
        let mut request = ChatCompletionRequest::new("gpt-4o", vec![]);
        request.timeout = Some(Duration::from_secs(5));
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("timeout").is_none());
    }

    #[test]
    fn test_message_shapes() {
        let tool = serde_json::to_value(ChatMessage::tool("call_123", "42")).unwrap();
        assert_eq!(
            tool,
            json!({"role": "tool", "content": "42", "tool_call_id": "call_123"})
        );

        let assistant = ChatMessage::assistant(None, vec![ToolCall::function("c1", "f", "{}")]);
        assert_eq!(
            serde_json::to_value(assistant).unwrap(),
            json!({
                "role": "assistant",
                "tool_calls": [{"id": "c1", "type": "function", "function": {"name": "f", "arguments": "{}"}}]
            })
        );
    }

    #[test]
    fn test_tool_choice_values() {
        assert_eq!(serde_json::to_string(&ToolChoice::Auto).unwrap(), "\"auto\"");
        assert_eq!(
            serde_json::to_string(&ToolChoice::Required).unwrap(),
            "\"required\""
        );
    }

    #[test]
    fn test_deserialize_response() {
        let json = r#"{
            "id": "chatcmpl-123",
            "object": "chat.completion",
            "created": 1234567890,
            "model": "gpt-4o",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "Hello!"},
                "finish_reason": "stop"
            }],
            "usage": {
                "prompt_tokens": 10,
                "completion_tokens": 5,
                "total_tokens": 15,
                "completion_tokens_details": {"reasoning_tokens": 2, "audio_tokens": null}
            }
        }"#;

        let response: ChatCompletionResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.id, "chatcmpl-123");
        assert_eq!(response.choices.len(), 1);
        assert_eq!(response.choices[0].finish_reason, Some(FinishReason::Stop));
        assert_eq!(response.choices[0].message.content.as_deref(), Some("Hello!"));
        let usage = response.usage.unwrap();
        assert_eq!(
            usage.completion_tokens_details.unwrap()["reasoning_tokens"],
            json!(2)
        );
    }

    #[test]
    fn test_unknown_finish_reason() {
        let choice: ChunkChoice =
            serde_json::from_str(r#"{"index": 0, "delta": {}, "finish_reason": "eos"}"#).unwrap();
        assert_eq!(choice.finish_reason, Some(FinishReason::Other));
    }

    #[test]
    fn test_deserialize_chunk() {
        let json = r#"{
            "id": "chatcmpl-123",
            "object": "chat.completion.chunk",
            "created": 1234567890,
            "model": "gpt-4o",
            "choices": [{
                "index": 0,
                "delta": {"tool_calls": [{"index": 0, "id": "call_1", "type": "function", "function": {"name": "get_", "arguments": ""}}]},
                "finish_reason": null
            }]
        }"#;

        let chunk: ChatCompletionChunk = serde_json::from_str(json).unwrap();
        let calls = chunk.choices[0].delta.tool_calls.as_ref().unwrap();
        assert_eq!(calls[0].id.as_deref(), Some("call_1"));
        assert_eq!(
            calls[0].function.as_ref().unwrap().name.as_deref(),
            Some("get_")
        );
    }
}
