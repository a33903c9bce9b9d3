//! OpenAI chat completions model.

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use modelwire_core::{
    from_unix_seconds, Cost, Message, MissingToolCallId, ModelResponse, ModelResponsePart,
    ModelSettings, TextPart, ToolCallPart,
};
use modelwire_tools::ToolDefinition;

use super::stream::{chunk_stream, start_stream};
use super::types::*;
use crate::auth::{BearerAuth, HeaderProvider};
use crate::config::{json_headers, require_model_name, require_valid_url, ProviderConfig};
use crate::error::{ModelError, ModelResult};
use crate::model::{AgentModel, Model, ModelRequestParameters, StreamedResponse};
use crate::transport::{header_map_to_hash, HttpRequest, HttpTransport, ReqwestTransport};

const PROVIDER: &str = "OpenAI";

/// OpenAI chat completions model.
#[derive(Clone)]
pub struct OpenAIModel {
    model_name: String,
    base_url: String,
    auth: Arc<dyn HeaderProvider>,
    transport: Arc<dyn HttpTransport>,
    default_timeout: Option<Duration>,
}

impl std::fmt::Debug for OpenAIModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIModel")
            .field("model_name", &self.model_name)
            .field("base_url", &self.base_url)
            .field("default_timeout", &self.default_timeout)
            .finish_non_exhaustive()
    }
}

impl OpenAIModel {
    /// Environment variable prefix (`OPENAI_API_KEY`, `OPENAI_BASE_URL`).
    pub const ENV_PREFIX: &'static str = "OPENAI";
    /// Default API root.
    pub const DEFAULT_BASE_URL: &'static str = "https://api.openai.com/v1";

    /// Create a model with an explicit API key, using the default transport.
    ///
    /// `OPENAI_BASE_URL` is honoured when set.
    pub fn new(model_name: impl Into<String>, api_key: impl Into<String>) -> ModelResult<Self> {
        let config = ProviderConfig::new()
            .with_api_key(api_key)
            .merge(ProviderConfig::from_env(Self::ENV_PREFIX));
        Self::from_config(model_name, config, Arc::new(ReqwestTransport::new()?))
    }

    /// Create a model from `OPENAI_API_KEY`.
    pub fn from_env(model_name: impl Into<String>) -> ModelResult<Self> {
        Self::from_config(
            model_name,
            ProviderConfig::from_env(Self::ENV_PREFIX),
            Arc::new(ReqwestTransport::new()?),
        )
    }

    /// Create a model from resolved configuration and an injected transport.
    pub fn from_config(
        model_name: impl Into<String>,
        config: ProviderConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> ModelResult<Self> {
        let model_name = model_name.into();
        require_model_name(&model_name)?;
        let api_key = config.require_api_key(Self::ENV_PREFIX)?;
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| Self::DEFAULT_BASE_URL.to_string());
        require_valid_url(&base_url)?;

        Ok(Self {
            auth: Arc::new(BearerAuth::new(api_key)),
            base_url,
            model_name,
            transport,
            default_timeout: config.timeout,
        })
    }

    /// Replace the header provider.
    #[must_use]
    pub fn with_auth(mut self, auth: Arc<dyn HeaderProvider>) -> Self {
        self.auth = auth;
        self
    }

    /// The bare model name.
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// The chat completions endpoint.
    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    /// Bind request parameters, keeping the concrete agent type.
    pub fn bind(&self, params: &ModelRequestParameters) -> OpenAIAgentModel {
        OpenAIAgentModel {
            model_name: self.model_name.clone(),
            url: self.endpoint(),
            auth: Arc::clone(&self.auth),
            transport: Arc::clone(&self.transport),
            default_timeout: self.default_timeout,
            allow_text_result: params.allow_text_result,
            tools: params.all_tools().map(map_tool).collect(),
        }
    }
}

impl Model for OpenAIModel {
    fn name(&self) -> String {
        format!("openai:{}", self.model_name)
    }

    fn agent_model(&self, params: ModelRequestParameters) -> ModelResult<Box<dyn AgentModel>> {
        Ok(Box::new(self.bind(&params)))
    }
}

fn map_tool(tool: &ToolDefinition) -> ChatTool {
    ChatTool::function(
        tool.name(),
        tool.description(),
        tool.parameters().clone(),
    )
}

/// An OpenAI model bound to a set of tools.
pub struct OpenAIAgentModel {
    model_name: String,
    url: String,
    auth: Arc<dyn HeaderProvider>,
    transport: Arc<dyn HttpTransport>,
    default_timeout: Option<Duration>,
    allow_text_result: bool,
    tools: Vec<ChatTool>,
}

impl std::fmt::Debug for OpenAIAgentModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIAgentModel")
            .field("model_name", &self.model_name)
            .field("url", &self.url)
            .field("allow_text_result", &self.allow_text_result)
            .field("tools", &self.tools.len())
            .finish_non_exhaustive()
    }
}

impl OpenAIAgentModel {
    /// Build the wire request for a conversation.
    pub fn build_request(
        &self,
        messages: &[Message],
        settings: Option<&ModelSettings>,
        stream: bool,
    ) -> ModelResult<ChatCompletionRequest> {
        let messages = messages
            .iter()
            .map(map_message)
            .collect::<ModelResult<Vec<_>>>()?;

        let mut request = ChatCompletionRequest::new(&self.model_name, messages);
        if !self.tools.is_empty() {
            request.tools = self.tools.clone();
            request.parallel_tool_calls = Some(true);
            request.tool_choice = Some(if self.allow_text_result {
                ToolChoice::Auto
            } else {
                ToolChoice::Required
            });
        }
        if stream {
            request.stream = true;
            request.stream_options = Some(StreamOptions {
                include_usage: true,
            });
        }
        if let Some(settings) = settings {
            request.max_tokens = settings.max_tokens;
            request.temperature = settings.temperature;
            request.top_p = settings.top_p;
            request.timeout = settings.timeout;
        }
        request.timeout = request.timeout.or(self.default_timeout);
        Ok(request)
    }

    async fn http_request(&self, request: &ChatCompletionRequest) -> ModelResult<HttpRequest> {
        let mut headers = json_headers();
        headers.extend(self.auth.headers().await?);
        let body = serde_json::to_vec(request)?;
        Ok(HttpRequest::new(&self.url, headers, body).with_timeout(request.timeout))
    }
}

#[async_trait]
impl AgentModel for OpenAIAgentModel {
    async fn request(
        &self,
        messages: &[Message],
        settings: Option<&ModelSettings>,
    ) -> ModelResult<(ModelResponse, Cost)> {
        let request = self.build_request(messages, settings, false)?;
        debug!(model = %self.model_name, url = %self.url, streamed = false, "Sending OpenAI request");

        let response = self.transport.send(self.http_request(&request).await?).await?;
        if !response.is_success() {
            let body = response.text();
            warn!(status = response.status, body_len = body.len(), "OpenAI request failed");
            return Err(handle_error_response(response.status, &body, &response.headers));
        }

        let completion: ChatCompletionResponse = serde_json::from_slice(&response.body)
            .map_err(|e| ModelError::unexpected_with_body(e.to_string(), response.text()))?;
        let cost = map_cost(completion.usage.as_ref());
        Ok((process_response(completion)?, cost))
    }

    async fn request_stream(
        &self,
        messages: &[Message],
        settings: Option<&ModelSettings>,
    ) -> ModelResult<StreamedResponse> {
        let request = self.build_request(messages, settings, true)?;
        debug!(model = %self.model_name, url = %self.url, streamed = true, "Sending OpenAI request");

        let response = self
            .transport
            .send_streaming(self.http_request(&request).await?)
            .await?;
        if !response.is_success() {
            let status = response.status;
            let headers = response.headers.clone();
            let body = response.drain().await?;
            warn!(status, body_len = body.len(), "OpenAI stream request failed");
            return Err(handle_error_response(status, &body, &headers));
        }

        start_stream(chunk_stream(response.body)).await
    }
}

fn tool_call_id(id: Option<&String>, kind: &str, tool_name: &str) -> ModelResult<String> {
    id.cloned()
        .ok_or_else(|| MissingToolCallId::new(PROVIDER, kind, tool_name).into())
}

/// Map one message onto its chat completions entry.
pub fn map_message(message: &Message) -> ModelResult<ChatMessage> {
    Ok(match message {
        Message::SystemPrompt(m) => ChatMessage::system(&m.content),
        Message::UserPrompt(m) => ChatMessage::user(&m.content),
        Message::ToolReturn(m) => ChatMessage::tool(
            tool_call_id(m.tool_call_id.as_ref(), "tool-return", &m.tool_name)?,
            m.model_response_str(),
        ),
        Message::RetryPrompt(m) => match &m.tool_name {
            None => ChatMessage::user(m.model_response()),
            Some(tool_name) => ChatMessage::tool(
                tool_call_id(m.tool_call_id.as_ref(), "retry-prompt", tool_name)?,
                m.model_response(),
            ),
        },
        Message::ModelResponse(m) => {
            let texts: Vec<&str> = m.text_parts().map(|t| t.content.as_str()).collect();
            let content = (!texts.is_empty()).then(|| texts.join("\n\n"));
            let tool_calls = m
                .tool_call_parts()
                .map(|call| {
                    Ok(ToolCall::function(
                        tool_call_id(call.tool_call_id.as_ref(), "tool-call", &call.tool_name)?,
                        &call.tool_name,
                        call.args.to_json_string(),
                    ))
                })
                .collect::<ModelResult<Vec<_>>>()?;
            ChatMessage::assistant(content, tool_calls)
        }
    })
}

/// Reconstruct a [`ModelResponse`] from a buffered completion.
pub fn process_response(response: ChatCompletionResponse) -> ModelResult<ModelResponse> {
    if response.choices.len() != 1 {
        return Err(ModelError::unexpected(format!(
            "Expected exactly one choice in OpenAI response, got {}",
            response.choices.len()
        )));
    }
    let timestamp = from_unix_seconds(response.created);
    let mut parts = Vec::new();
    for choice in response.choices {
        let message = choice.message;
        if let Some(content) = message.content {
            parts.push(ModelResponsePart::Text(TextPart::new(content)));
        }
        for call in message.tool_calls.unwrap_or_default() {
            parts.push(ModelResponsePart::ToolCall(ToolCallPart::from_json(
                call.function.name,
                call.function.arguments,
                Some(call.id),
            )));
        }
    }
    if parts.is_empty() {
        return Err(ModelError::unexpected(
            "OpenAI response contained neither content nor tool calls",
        ));
    }
    Ok(ModelResponse::new(parts).with_timestamp(timestamp))
}

/// Map OpenAI usage onto a [`Cost`].
///
/// Nested detail counters are flattened under their own names, completion
/// details first.
pub fn map_cost(usage: Option<&Usage>) -> Cost {
    let Some(usage) = usage else {
        return Cost::default();
    };
    let mut cost = Cost::with_tokens(
        usage.prompt_tokens,
        usage.completion_tokens,
        usage.total_tokens,
    );
    let details = [&usage.completion_tokens_details, &usage.prompt_tokens_details];
    for map in details.into_iter().flatten() {
        for (key, value) in map {
            if let Some(value) = value.as_u64() {
                cost.details.insert(key.clone(), value);
            }
        }
    }
    cost
}

fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get("retry-after")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Turn a drained non-success response into a typed error.
pub(crate) fn handle_error_response(status: u16, body: &str, headers: &HeaderMap) -> ModelError {
    if status == 429 {
        return ModelError::rate_limited(parse_retry_after(headers));
    }
    match serde_json::from_str::<OpenAIError>(body) {
        Ok(err) if status == 401 => ModelError::auth(err.error.message),
        Ok(err) => ModelError::Api {
            message: err.error.message,
            code: err.error.code,
        },
        Err(_) if status == 401 => ModelError::auth(body),
        Err(_) => ModelError::http_with_headers(status, body, header_map_to_hash(headers)),
    }
}
