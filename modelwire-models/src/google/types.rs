//! Gemini API types.
//!
//! Request keys follow the casing the API documents for each field, which is
//! not uniform: `functionDeclarations` and the part keys are camelCase while
//! `system_instruction`, `tool_config` and `generation_config` are
//! snake_case. Response types accept either spelling.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::time::Duration;

// ============================================================================
// Request Types
// ============================================================================

/// Generate content request.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateContentRequest {
    /// Conversation contents.
    pub contents: Vec<Content>,
    /// Tool declarations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<GeminiTools>,
    /// Tool configuration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_config: Option<ToolConfig>,
    /// System instructions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    /// Generation configuration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
    /// Per-request deadline, handed to the transport.
    #[serde(skip)]
    pub timeout: Option<Duration>,
}

impl GenerateContentRequest {
    /// Create a new request.
    pub fn new(contents: Vec<Content>) -> Self {
        Self {
            contents,
            tools: None,
            tool_config: None,
            system_instruction: None,
            generation_config: None,
            timeout: None,
        }
    }
}

/// Author of a content entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentRole {
    /// User side, including tool results.
    User,
    /// Model side.
    Model,
}

/// Content (message) in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    /// Role of the author.
    pub role: ContentRole,
    /// Content parts.
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    /// Create user content.
    pub fn user(parts: Vec<Part>) -> Self {
        Self {
            role: ContentRole::User,
            parts,
        }
    }

    /// Create model content.
    pub fn model(parts: Vec<Part>) -> Self {
        Self {
            role: ContentRole::Model,
            parts,
        }
    }
}

/// What a part carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartKind {
    /// Plain text.
    Text,
    /// A function call from the model.
    FunctionCall,
    /// A function result.
    FunctionResponse,
    /// Nothing this crate understands.
    Unknown,
}

/// Content part.
///
/// Exactly one field is set on a well-formed part.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Part {
    /// Text content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Function call from the model.
    #[serde(
        rename = "functionCall",
        alias = "function_call",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub function_call: Option<FunctionCall>,
    /// Function response to the model.
    #[serde(
        rename = "functionResponse",
        alias = "function_response",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub function_response: Option<FunctionResponse>,
}

impl Part {
    /// Create a text part.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    /// Create a function call part.
    pub fn function_call(name: impl Into<String>, args: Map<String, JsonValue>) -> Self {
        Self {
            function_call: Some(FunctionCall {
                name: name.into(),
                args,
            }),
            ..Default::default()
        }
    }

    /// Create a function response part.
    pub fn function_response(name: impl Into<String>, response: Map<String, JsonValue>) -> Self {
        Self {
            function_response: Some(FunctionResponse {
                name: name.into(),
                response,
            }),
            ..Default::default()
        }
    }

    /// Classify the part.
    pub fn kind(&self) -> PartKind {
        if self.text.is_some() {
            PartKind::Text
        } else if self.function_call.as_ref().is_some_and(|c| !c.name.is_empty()) {
            PartKind::FunctionCall
        } else if self.function_response.is_some() {
            PartKind::FunctionResponse
        } else {
            PartKind::Unknown
        }
    }
}

/// Function call from the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Function name.
    #[serde(default)]
    pub name: String,
    /// Function arguments.
    #[serde(default)]
    pub args: Map<String, JsonValue>,
}

/// Function response to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionResponse {
    /// Function name.
    pub name: String,
    /// Response data.
    pub response: Map<String, JsonValue>,
}

/// Tool declarations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeminiTools {
    /// Function declarations.
    #[serde(rename = "functionDeclarations")]
    pub function_declarations: Vec<FunctionDeclaration>,
}

/// Function declaration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionDeclaration {
    /// Function name.
    pub name: String,
    /// Function description.
    pub description: String,
    /// Parameter schema, in the restricted Gemini dialect.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<JsonValue>,
}

/// Tool configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolConfig {
    /// Function calling config.
    pub function_calling_config: FunctionCallingConfig,
}

impl ToolConfig {
    /// Force a call to one of `names`.
    pub fn any(names: Vec<String>) -> Self {
        Self {
            function_calling_config: FunctionCallingConfig {
                mode: FunctionCallingMode::Any,
                allowed_function_names: names,
            },
        }
    }
}

/// Function calling mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FunctionCallingMode {
    /// The model must call a function.
    Any,
    /// The model decides.
    Auto,
}

/// Function calling configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionCallingConfig {
    /// Mode.
    pub mode: FunctionCallingMode,
    /// Functions the model may call.
    pub allowed_function_names: Vec<String>,
}

/// Generation configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GenerationConfig {
    /// Max output tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u64>,
    /// Temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Top-p.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
}

impl GenerationConfig {
    /// Whether no field is set.
    pub fn is_empty(&self) -> bool {
        self.max_output_tokens.is_none() && self.temperature.is_none() && self.top_p.is_none()
    }
}

// ============================================================================
// Response Types
// ============================================================================

/// Generate content response, also one element of a streamed array.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateContentResponse {
    /// Candidates.
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    /// Usage; on streams usually only on the last element.
    #[serde(rename = "usageMetadata", alias = "usage_metadata", default)]
    pub usage_metadata: Option<UsageMetadata>,
    /// Prompt feedback.
    #[serde(rename = "promptFeedback", alias = "prompt_feedback", default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

/// Why the model stopped generating.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FinishReason {
    /// Natural stop.
    Stop,
    /// Token limit reached.
    MaxTokens,
    /// Any other reason, kept verbatim.
    #[serde(untagged)]
    Other(String),
}

/// Response candidate.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Candidate {
    /// Generated content.
    #[serde(default)]
    pub content: Option<Content>,
    /// Finish reason.
    #[serde(rename = "finishReason", alias = "finish_reason", default)]
    pub finish_reason: Option<FinishReason>,
    /// Average log probability.
    #[serde(rename = "avgLogProbs", alias = "avg_log_probs", default)]
    pub avg_log_probs: Option<f64>,
    /// Candidate index.
    #[serde(default)]
    pub index: Option<u32>,
    /// Safety ratings.
    #[serde(rename = "safetyRatings", alias = "safety_ratings", default)]
    pub safety_ratings: Vec<SafetyRating>,
}

impl Candidate {
    /// Parts of the candidate's content, empty if there is none.
    pub fn parts(&self) -> &[Part] {
        self.content.as_ref().map_or(&[], |c| c.parts.as_slice())
    }
}

/// Safety rating.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SafetyRating {
    /// Harm category.
    pub category: String,
    /// Probability bucket.
    pub probability: String,
}

/// Usage metadata.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UsageMetadata {
    /// Prompt tokens.
    #[serde(rename = "promptTokenCount", alias = "prompt_token_count", default)]
    pub prompt_token_count: u64,
    /// Candidate tokens.
    #[serde(
        rename = "candidatesTokenCount",
        alias = "candidates_token_count",
        default
    )]
    pub candidates_token_count: u64,
    /// Total tokens.
    #[serde(rename = "totalTokenCount", alias = "total_token_count", default)]
    pub total_token_count: u64,
    /// Tokens served from cached content.
    #[serde(
        rename = "cachedContentTokenCount",
        alias = "cached_content_token_count",
        default
    )]
    pub cached_content_token_count: Option<u64>,
}

/// Prompt feedback.
#[derive(Debug, Clone, Deserialize)]
pub struct PromptFeedback {
    /// Reason the prompt was blocked.
    #[serde(rename = "blockReason", alias = "block_reason", default)]
    pub block_reason: Option<String>,
    /// Safety ratings.
    #[serde(rename = "safetyRatings", alias = "safety_ratings", default)]
    pub safety_ratings: Vec<SafetyRating>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_request_key_casing() {
        let mut request = GenerateContentRequest::new(vec![Content::model(vec![Part::function_call(
            "search",
            json!({"q": "rust"}).as_object().unwrap().clone(),
        )])]);
        request.tools = Some(GeminiTools {
            function_declarations: vec![FunctionDeclaration {
                name: "search".into(),
                description: "Search".into(),
                parameters: None,
            }],
        });
        request.tool_config = Some(ToolConfig::any(vec!["search".into()]));
        request.system_instruction = Some(Content::user(vec![Part::text("Be brief.")]));
        request.generation_config = Some(GenerationConfig {
            max_output_tokens: Some(10),
            ..Default::default()
        });
        request.timeout = Some(Duration::from_secs(3));

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "contents": [{"role": "model", "parts": [{"functionCall": {"name": "search", "args": {"q": "rust"}}}]}],
                "tools": {"functionDeclarations": [{"name": "search", "description": "Search"}]},
                "tool_config": {"function_calling_config": {"mode": "ANY", "allowed_function_names": ["search"]}},
                "system_instruction": {"role": "user", "parts": [{"text": "Be brief."}]},
                "generation_config": {"max_output_tokens": 10}
            })
        );
    }

    #[test]
    fn test_response_accepts_both_casings() {
        let camel: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"functionCall": {"name": "f", "args": {}}}]},
                "finishReason": "STOP",
                "avgLogProbs": -0.5,
                "index": 0,
                "safetyRatings": [{"category": "HARM_CATEGORY_HARASSMENT", "probability": "NEGLIGIBLE"}]
            }],
            "usageMetadata": {"promptTokenCount": 3, "totalTokenCount": 3}
        }))
        .unwrap();
        let snake: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"function_call": {"name": "f", "args": {}}}]},
                "finish_reason": "MAX_TOKENS"
            }],
            "usage_metadata": {"prompt_token_count": 3}
        }))
        .unwrap();

        assert_eq!(camel.candidates[0].parts()[0].kind(), PartKind::FunctionCall);
        assert_eq!(snake.candidates[0].parts()[0].kind(), PartKind::FunctionCall);
        assert_eq!(camel.candidates[0].finish_reason, Some(FinishReason::Stop));
        assert_eq!(snake.candidates[0].finish_reason, Some(FinishReason::MaxTokens));
        assert_eq!(snake.usage_metadata.unwrap().prompt_token_count, 3);
    }

    #[test]
    fn test_unknown_finish_reason_and_feedback() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{"finishReason": "SAFETY"}],
            "promptFeedback": {"blockReason": "OTHER", "safetyRatings": []}
        }))
        .unwrap();
        assert_eq!(
            response.candidates[0].finish_reason,
            Some(FinishReason::Other("SAFETY".into()))
        );
        assert!(response.candidates[0].parts().is_empty());
        assert_eq!(
            response.prompt_feedback.unwrap().block_reason.as_deref(),
            Some("OTHER")
        );
    }

    #[test]
    fn test_part_kind() {
        assert_eq!(Part::text("hi").kind(), PartKind::Text);
        assert_eq!(Part::default().kind(), PartKind::Unknown);
        assert_eq!(
            Part::function_response("f", Map::new()).kind(),
            PartKind::FunctionResponse
        );
        let unnamed: Part = serde_json::from_value(json!({"functionCall": {}})).unwrap();
        assert_eq!(unnamed.kind(), PartKind::Unknown);
    }
}
