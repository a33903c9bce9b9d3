//! # modelwire - LLM provider adapters for Rust
//!
//! modelwire translates a canonical conversation into the wire format of a
//! large-language-model API, sends it, and rebuilds a canonical response,
//! including while the response is still streaming.
//!
//! ## Quick Start
//!
//! ```ignore
//! use modelwire::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let model = GeminiModel::from_env("gemini-1.5-flash")?;
//!     let agent = model.agent_model(ModelRequestParameters::new().with_allow_text_result(true))?;
//!
//!     match agent.request_stream(&[UserPrompt::new("Write a haiku").into()], None).await? {
//!         StreamedResponse::Text(mut text) => {
//!             while text.advance().await? == Advance::Chunk {
//!                 for fragment in text.materialize(false)? {
//!                     print!("{fragment}");
//!                 }
//!             }
//!             for fragment in text.materialize(true)? {
//!                 print!("{fragment}");
//!             }
//!         }
//!         StreamedResponse::Structured(mut calls) => {
//!             while calls.advance().await? == Advance::Chunk {}
//!             println!("{:?}", calls.materialize(true)?);
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`modelwire_core`] - Messages, cost accounting, settings and errors
//! - [`modelwire_tools`] - Tool definitions
//! - [`modelwire_streaming`] - SSE framing and partial JSON parsing
//! - [`modelwire_models`] - Model traits, transport and the provider adapters

#![warn(missing_docs)]
#![deny(unsafe_code)]

/// Core types, messages, and error handling.
pub use modelwire_core as core;

/// Model traits and provider adapters.
pub use modelwire_models as models;

/// Streaming support.
pub use modelwire_streaming as streaming;

/// Tool definitions.
pub use modelwire_tools as tools;

// Core
pub use modelwire_core::messages::{messages_from_json, messages_to_json};
pub use modelwire_core::{
    Cost, Message, ModelResponse, ModelResponsePart,
    ModelSettings, ModelwireError, RetryPrompt, SystemPrompt, TextPart, ToolCallArgs,
    ToolCallPart, ToolReturn, UnexpectedModelBehavior, UserError, UserPrompt,
};

// Tools
pub use modelwire_tools::{ObjectJsonSchema, ToolDefinition};

// Models
pub use modelwire_models::{
    google::GeminiModel, openai::OpenAIModel, Advance, AgentModel, HttpTransport,
    JsonSchemaTransformer, MockTransport, Model, ModelError, ModelRequestParameters, ModelResult,
    ProviderConfig, ReqwestTransport, StreamStructuredResponse, StreamTextResponse,
    StreamedResponse,
};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        Advance, AgentModel, Cost, GeminiModel, Message, Model, ModelError,
        ModelRequestParameters, ModelResponse, ModelResponsePart, ModelSettings, OpenAIModel,
        StreamedResponse, SystemPrompt, ToolDefinition, UserPrompt,
    };
}

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use super::{MockTransport, ProviderConfig};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_prelude_request_through_mock_transport() {
        let transport = MockTransport::new().with_json(
            200,
            r#"{
                "candidates": [{"content": {"role": "model", "parts": [{"text": "Paris"}]}}],
                "usageMetadata": {"promptTokenCount": 9, "candidatesTokenCount": 1, "totalTokenCount": 10}
            }"#,
        );
        let model = GeminiModel::from_config(
            "gemini-1.5-flash",
            ProviderConfig::new().with_api_key("g-key"),
            Arc::new(transport.clone()),
        )
        .unwrap();
        let agent = model
            .agent_model(ModelRequestParameters::new().with_allow_text_result(true))
            .unwrap();

        let (response, cost) = agent
            .request(
                &[
                    SystemPrompt::new("Answer briefly.").into(),
                    UserPrompt::new("Capital of France?").into(),
                ],
                Some(&ModelSettings::new().temperature(0.0)),
            )
            .await
            .unwrap();

        assert_eq!(response.text_content(), "Paris");
        assert_eq!(cost, Cost::with_tokens(9, 1, 10));
        let body = transport.last_body().unwrap();
        assert_eq!(body["generation_config"]["temperature"], 0.0);
        assert_eq!(body["system_instruction"]["parts"][0]["text"], "Answer briefly.");
    }
}
