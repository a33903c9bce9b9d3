//! Gemini model.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value as JsonValue};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use modelwire_core::{
    now_utc, Cost, Message, ModelResponse, ModelResponsePart, ModelSettings, TextPart,
    ToolCallPart,
};
use modelwire_tools::ToolDefinition;

use super::stream::start_stream;
use super::types::*;
use crate::auth::{ApiKeyAuth, HeaderProvider};
use crate::config::{json_headers, require_model_name, require_valid_url, ProviderConfig};
use crate::error::{ModelError, ModelResult};
use crate::model::{AgentModel, Model, ModelRequestParameters, StreamedResponse};
use crate::schema_transformer::JsonSchemaTransformer;
use crate::transport::{HttpRequest, HttpTransport, ReqwestTransport};

/// Gemini model using the `generativelanguage.googleapis.com` API.
#[derive(Clone)]
pub struct GeminiModel {
    model_name: String,
    url: String,
    auth: Arc<dyn HeaderProvider>,
    transport: Arc<dyn HttpTransport>,
    default_timeout: Option<Duration>,
}

impl std::fmt::Debug for GeminiModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiModel")
            .field("model_name", &self.model_name)
            .field("url", &self.url)
            .field("default_timeout", &self.default_timeout)
            .finish_non_exhaustive()
    }
}

impl GeminiModel {
    /// Environment variable prefix (`GEMINI_API_KEY`, `GEMINI_BASE_URL`).
    pub const ENV_PREFIX: &'static str = "GEMINI";
    /// URL template; `{model}` is replaced by the model name and the
    /// method (`generateContent` or `streamGenerateContent`) is appended.
    pub const DEFAULT_URL_TEMPLATE: &'static str =
        "https://generativelanguage.googleapis.com/v1beta/models/{model}:";

    /// Create a model with an explicit API key, using the default transport.
    pub fn new(model_name: impl Into<String>, api_key: impl Into<String>) -> ModelResult<Self> {
        let config = ProviderConfig::new()
            .with_api_key(api_key)
            .merge(ProviderConfig::from_env(Self::ENV_PREFIX));
        Self::from_config(model_name, config, Arc::new(ReqwestTransport::new()?))
    }

    /// Create a model from `GEMINI_API_KEY`.
    pub fn from_env(model_name: impl Into<String>) -> ModelResult<Self> {
        Self::from_config(
            model_name,
            ProviderConfig::from_env(Self::ENV_PREFIX),
            Arc::new(ReqwestTransport::new()?),
        )
    }

    /// Create a model from resolved configuration and an injected transport.
    ///
    /// A configured base URL is used as the URL template.
    pub fn from_config(
        model_name: impl Into<String>,
        config: ProviderConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> ModelResult<Self> {
        let model_name = model_name.into();
        require_model_name(&model_name)?;
        let api_key = config.require_api_key(Self::ENV_PREFIX)?;
        let template = config
            .base_url
            .as_deref()
            .unwrap_or(Self::DEFAULT_URL_TEMPLATE);
        let url = template.replace("{model}", &model_name);
        require_valid_url(&url)?;

        Ok(Self {
            auth: Arc::new(ApiKeyAuth::google(api_key)),
            url,
            model_name,
            transport,
            default_timeout: config.timeout,
        })
    }

    /// Replace the URL template.
    pub fn with_url_template(mut self, template: &str) -> ModelResult<Self> {
        let url = template.replace("{model}", &self.model_name);
        require_valid_url(&url)?;
        self.url = url;
        Ok(self)
    }

    /// Replace the header provider.
    #[must_use]
    pub fn with_auth(mut self, auth: Arc<dyn HeaderProvider>) -> Self {
        self.auth = auth;
        self
    }

    /// URL prefix the method name is appended to.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Bind request parameters, keeping the concrete agent type.
    ///
    /// Tool schemas are simplified here, so an unsupported schema fails
    /// before any request is made.
    pub fn bind(&self, params: &ModelRequestParameters) -> ModelResult<GeminiAgentModel> {
        let transformer = JsonSchemaTransformer::gemini();
        let declarations = params
            .all_tools()
            .map(|tool| function_declaration(&transformer, tool))
            .collect::<ModelResult<Vec<_>>>()?;

        let tool_config = (!params.allow_text_result && !declarations.is_empty())
            .then(|| ToolConfig::any(declarations.iter().map(|d| d.name.clone()).collect()));
        let tools = (!declarations.is_empty()).then(|| GeminiTools {
            function_declarations: declarations,
        });

        Ok(GeminiAgentModel {
            model_name: self.model_name.clone(),
            url: self.url.clone(),
            auth: Arc::clone(&self.auth),
            transport: Arc::clone(&self.transport),
            default_timeout: self.default_timeout,
            tools,
            tool_config,
        })
    }
}

impl Model for GeminiModel {
    fn name(&self) -> String {
        self.model_name.clone()
    }

    fn agent_model(&self, params: ModelRequestParameters) -> ModelResult<Box<dyn AgentModel>> {
        Ok(Box::new(self.bind(&params)?))
    }
}

fn function_declaration(
    transformer: &JsonSchemaTransformer,
    tool: &ToolDefinition,
) -> ModelResult<FunctionDeclaration> {
    let schema = transformer.transform(tool.parameters())?;
    let has_properties = schema
        .get("properties")
        .and_then(JsonValue::as_object)
        .is_some_and(|p| !p.is_empty());
    Ok(FunctionDeclaration {
        name: tool.name().to_string(),
        description: tool.description().to_string(),
        parameters: has_properties.then_some(schema),
    })
}

/// A Gemini model bound to a set of tools.
pub struct GeminiAgentModel {
    model_name: String,
    url: String,
    auth: Arc<dyn HeaderProvider>,
    transport: Arc<dyn HttpTransport>,
    default_timeout: Option<Duration>,
    tools: Option<GeminiTools>,
    tool_config: Option<ToolConfig>,
}

impl std::fmt::Debug for GeminiAgentModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiAgentModel")
            .field("model_name", &self.model_name)
            .field("url", &self.url)
            .field("tools", &self.tools)
            .field("tool_config", &self.tool_config)
            .finish_non_exhaustive()
    }
}

impl GeminiAgentModel {
    /// Build the wire request for a conversation.
    ///
    /// System prompts are collected, in order, into `system_instruction`.
    pub fn build_request(
        &self,
        messages: &[Message],
        settings: Option<&ModelSettings>,
    ) -> ModelResult<GenerateContentRequest> {
        let mut system_parts = Vec::new();
        let mut contents = Vec::new();
        for message in messages {
            match message {
                Message::SystemPrompt(m) => system_parts.push(Part::text(&m.content)),
                other => contents.push(map_content(other)?),
            }
        }

        let mut request = GenerateContentRequest::new(contents);
        if !system_parts.is_empty() {
            request.system_instruction = Some(Content::user(system_parts));
        }
        request.tools = self.tools.clone();
        request.tool_config = self.tool_config.clone();

        if let Some(settings) = settings {
            let generation_config = GenerationConfig {
                max_output_tokens: settings.max_tokens,
                temperature: settings.temperature,
                top_p: settings.top_p,
            };
            if !generation_config.is_empty() {
                request.generation_config = Some(generation_config);
            }
            request.timeout = settings.timeout;
        }
        request.timeout = request.timeout.or(self.default_timeout);
        Ok(request)
    }

    async fn http_request(
        &self,
        request: &GenerateContentRequest,
        streamed: bool,
    ) -> ModelResult<HttpRequest> {
        let method = if streamed {
            "streamGenerateContent"
        } else {
            "generateContent"
        };
        let url = format!("{}{}", self.url, method);
        debug!(model = %self.model_name, url = %url, streamed, "Sending Gemini request");

        let mut headers = json_headers();
        headers.extend(self.auth.headers().await?);
        let body = serde_json::to_vec(request)?;
        Ok(HttpRequest::new(url, headers, body).with_timeout(request.timeout))
    }
}

fn unexpected_status(status: u16, body: String) -> ModelError {
    warn!(status, body_len = body.len(), "Gemini request failed");
    ModelError::unexpected_with_body(format!("Unexpected response from gemini {}", status), body)
}

#[async_trait]
impl AgentModel for GeminiAgentModel {
    async fn request(
        &self,
        messages: &[Message],
        settings: Option<&ModelSettings>,
    ) -> ModelResult<(ModelResponse, Cost)> {
        let request = self.build_request(messages, settings)?;
        let response = self
            .transport
            .send(self.http_request(&request, false).await?)
            .await?;
        if !response.is_success() {
            return Err(unexpected_status(response.status, response.text()));
        }

        let parsed: GenerateContentResponse = serde_json::from_slice(&response.body)
            .map_err(|e| ModelError::unexpected_with_body(e.to_string(), response.text()))?;
        let cost = map_usage(&parsed);
        Ok((process_response(&parsed)?, cost))
    }

    async fn request_stream(
        &self,
        messages: &[Message],
        settings: Option<&ModelSettings>,
    ) -> ModelResult<StreamedResponse> {
        let request = self.build_request(messages, settings)?;
        let response = self
            .transport
            .send_streaming(self.http_request(&request, true).await?)
            .await?;
        if !response.is_success() {
            let status = response.status;
            return Err(unexpected_status(status, response.drain().await?));
        }

        start_stream(response.body).await
    }
}

/// Map a non-system message onto a Gemini content entry.
pub fn map_content(message: &Message) -> ModelResult<Content> {
    Ok(match message {
        Message::SystemPrompt(m) => Content::user(vec![Part::text(&m.content)]),
        Message::UserPrompt(m) => Content::user(vec![Part::text(&m.content)]),
        Message::ToolReturn(m) => Content::user(vec![Part::function_response(
            &m.tool_name,
            m.model_response_object(),
        )]),
        Message::RetryPrompt(m) => {
            let part = match &m.tool_name {
                None => Part::text(m.model_response()),
                Some(tool_name) => {
                    let mut response = Map::new();
                    response.insert(
                        "call_error".to_string(),
                        JsonValue::String(m.model_response()),
                    );
                    Part::function_response(tool_name, response)
                }
            };
            Content::user(vec![part])
        }
        Message::ModelResponse(m) => {
            let parts = m
                .parts
                .iter()
                .map(|part| match part {
                    ModelResponsePart::Text(t) => Ok(Part::text(&t.content)),
                    ModelResponsePart::ToolCall(call) => {
                        Ok(Part::function_call(&call.tool_name, call.args.to_dict()?))
                    }
                })
                .collect::<ModelResult<Vec<_>>>()?;
            Content::model(parts)
        }
    })
}

/// Reconstruct a [`ModelResponse`] from a buffered response.
pub fn process_response(response: &GenerateContentResponse) -> ModelResult<ModelResponse> {
    let candidate = single_candidate(response)?;
    let parts = candidate.parts();
    if parts.is_empty() {
        return Err(ModelError::unexpected(format!(
            "Gemini response contained no parts, finish reason: {:?}",
            candidate.finish_reason
        )));
    }
    process_parts(parts, None)
}

pub(crate) fn single_candidate(response: &GenerateContentResponse) -> ModelResult<&Candidate> {
    match response.candidates.as_slice() {
        [candidate] => Ok(candidate),
        _ => Err(ModelError::unexpected(
            "Expected exactly one candidate in Gemini response",
        )),
    }
}

/// Map parts onto response parts; anything but text or a function call fails.
pub(crate) fn process_parts<'a>(
    parts: impl IntoIterator<Item = &'a Part>,
    timestamp: Option<DateTime<Utc>>,
) -> ModelResult<ModelResponse> {
    let mut items = Vec::new();
    for part in parts {
        match (&part.text, &part.function_call, part.kind()) {
            (Some(text), _, PartKind::Text) => {
                items.push(ModelResponsePart::Text(TextPart::new(text.clone())))
            }
            (_, Some(call), PartKind::FunctionCall) => items.push(ModelResponsePart::ToolCall(
                ToolCallPart::from_dict(&call.name, call.args.clone(), None),
            )),
            _ => {
                return Err(ModelError::unexpected(format!(
                    "Unsupported response from Gemini, expected all parts to be function calls or text, got: {:?}",
                    part
                )))
            }
        }
    }
    Ok(ModelResponse::new(items).with_timestamp(timestamp.unwrap_or_else(now_utc)))
}

/// Map usage metadata onto a [`Cost`]; no metadata is an empty cost.
pub fn map_usage(response: &GenerateContentResponse) -> Cost {
    let Some(metadata) = &response.usage_metadata else {
        return Cost::default();
    };
    let mut cost = Cost::with_tokens(
        metadata.prompt_token_count,
        metadata.candidates_token_count,
        metadata.total_token_count,
    );
    if let Some(cached) = metadata.cached_content_token_count.filter(|c| *c > 0) {
        cost.details
            .insert("cached_content_token_count".to_string(), cached);
    }
    cost
}
