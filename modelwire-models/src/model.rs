//! Core model traits and types.
//!
//! A [`Model`] names a provider model and binds request parameters (the tools
//! on offer, whether free text is an acceptable answer) into an
//! [`AgentModel`]. The agent model is what actually talks to the provider,
//! either in one buffered exchange or as a stream.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use modelwire_core::{Cost, Message, ModelResponse, ModelSettings};
use modelwire_tools::ToolDefinition;

use crate::error::ModelResult;

/// Parameters bound into an [`AgentModel`].
#[derive(Debug, Clone, Default)]
pub struct ModelRequestParameters {
    /// Tools the model may call while working.
    pub function_tools: Vec<ToolDefinition>,
    /// Whether a plain text answer ends the exchange.
    pub allow_text_result: bool,
    /// Tools whose call produces the final structured result.
    pub result_tools: Vec<ToolDefinition>,
}

impl ModelRequestParameters {
    /// Create new empty parameters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the function tools.
    #[must_use]
    pub fn with_function_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.function_tools = tools;
        self
    }

    /// Set the result tools.
    #[must_use]
    pub fn with_result_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.result_tools = tools;
        self
    }

    /// Set whether free text is an acceptable result.
    #[must_use]
    pub fn with_allow_text_result(mut self, allow: bool) -> Self {
        self.allow_text_result = allow;
        self
    }

    /// All tools in wire order: function tools, then result tools.
    pub fn all_tools(&self) -> impl Iterator<Item = &ToolDefinition> {
        self.function_tools.iter().chain(self.result_tools.iter())
    }

    /// Whether any tool is declared.
    #[must_use]
    pub fn has_tools(&self) -> bool {
        !self.function_tools.is_empty() || !self.result_tools.is_empty()
    }
}

/// A provider model.
pub trait Model: Send + Sync {
    /// Display name of the model.
    fn name(&self) -> String;

    /// Bind request parameters, producing a model ready to be called.
    fn agent_model(&self, params: ModelRequestParameters) -> ModelResult<Box<dyn AgentModel>>;
}

/// A model with tools and result mode bound.
#[async_trait]
pub trait AgentModel: Send + Sync {
    /// Make a buffered request.
    async fn request(
        &self,
        messages: &[Message],
        settings: Option<&ModelSettings>,
    ) -> ModelResult<(ModelResponse, Cost)>;

    /// Make a streaming request.
    ///
    /// Returns once enough of the stream has arrived to tell whether the
    /// model is answering in text or calling tools.
    async fn request_stream(
        &self,
        messages: &[Message],
        settings: Option<&ModelSettings>,
    ) -> ModelResult<StreamedResponse>;
}

/// Outcome of [`StreamTextResponse::advance`] and [`StreamStructuredResponse::advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// A chunk was folded into the accumulated state.
    Chunk,
    /// The stream is exhausted.
    End,
}

/// A streamed response the model is answering in free text.
#[async_trait]
pub trait StreamTextResponse: Send {
    /// Wait for the next chunk and fold it in.
    async fn advance(&mut self) -> ModelResult<Advance>;

    /// Text fragments that arrived since the previous call.
    ///
    /// Pass `is_final = true` exactly once, after [`Advance::End`].
    fn materialize(&mut self, is_final: bool) -> ModelResult<Vec<String>>;

    /// Cost accumulated so far.
    fn cost(&self) -> Cost;

    /// When the response was produced.
    fn timestamp(&self) -> DateTime<Utc>;
}

/// A streamed response the model is answering with tool calls.
#[async_trait]
pub trait StreamStructuredResponse: Send {
    /// Wait for the next chunk and fold it in.
    async fn advance(&mut self) -> ModelResult<Advance>;

    /// The response assembled so far.
    ///
    /// Pass `is_final = true` exactly once, after [`Advance::End`].
    fn materialize(&mut self, is_final: bool) -> ModelResult<ModelResponse>;

    /// Cost accumulated so far.
    fn cost(&self) -> Cost;

    /// When the response was produced.
    fn timestamp(&self) -> DateTime<Utc>;
}

/// A streamed response, classified by what the model started producing.
pub enum StreamedResponse {
    /// Free text.
    Text(Box<dyn StreamTextResponse>),
    /// Tool calls.
    Structured(Box<dyn StreamStructuredResponse>),
}

impl StreamedResponse {
    /// Whether this is a text stream.
    #[must_use]
    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text(_))
    }

    /// Take the text stream, if this is one.
    pub fn into_text(self) -> Option<Box<dyn StreamTextResponse>> {
        match self {
            Self::Text(s) => Some(s),
            Self::Structured(_) => None,
        }
    }

    /// Take the structured stream, if this is one.
    pub fn into_structured(self) -> Option<Box<dyn StreamStructuredResponse>> {
        match self {
            Self::Structured(s) => Some(s),
            Self::Text(_) => None,
        }
    }
}

impl std::fmt::Debug for StreamedResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(_) => f.write_str("StreamedResponse::Text"),
            Self::Structured(_) => f.write_str("StreamedResponse::Structured"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameters_tool_order() {
        let params = ModelRequestParameters::new()
            .with_function_tools(vec![ToolDefinition::new("search", "Search")])
            .with_result_tools(vec![ToolDefinition::new("final_result", "Result")]);

        let names: Vec<&str> = params.all_tools().map(|t| t.name()).collect();
        assert_eq!(names, vec!["search", "final_result"]);
        assert!(params.has_tools());
        assert!(!params.allow_text_result);
    }

    #[test]
    fn test_empty_parameters() {
        let params = ModelRequestParameters::new().with_allow_text_result(true);
        assert!(!params.has_tools());
        assert!(params.allow_text_result);
    }
}
