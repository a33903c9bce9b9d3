//! # modelwire-models
//!
//! Model traits and provider adapters for modelwire.
//!
//! Each adapter turns a canonical conversation into one provider's wire
//! format, sends it through an [`HttpTransport`], and rebuilds a canonical
//! [`ModelResponse`](modelwire_core::ModelResponse), either buffered or
//! incrementally while the response streams in:
//!
//! - **OpenAI**: chat completions, SSE deltas ([`openai::OpenAIModel`])
//! - **Gemini**: `generateContent`, a streamed JSON array ([`google::GeminiModel`])
//!
//! ## Example
//!
//! ```rust,ignore
//! use modelwire_models::{Model, ModelRequestParameters, OpenAIModel};
//! use modelwire_core::{ModelSettings, UserPrompt};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let model = OpenAIModel::from_env("gpt-4o")?;
//!     let agent = model.agent_model(ModelRequestParameters::new().with_allow_text_result(true))?;
//!
//!     let settings = ModelSettings::new().temperature(0.7);
//!     let (response, cost) = agent
//!         .request(&[UserPrompt::new("Hello!").into()], Some(&settings))
//!         .await?;
//!     println!("{} ({} tokens)", response.text_content(), cost.total());
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod auth;
pub mod config;
pub mod error;
pub mod google;
pub mod mock;
pub mod model;
pub mod openai;
pub mod schema_transformer;
pub mod transport;

// Re-exports
pub use auth::{ApiKeyAuth, BearerAuth, HeaderProvider};
pub use config::{ProviderConfig, DEFAULT_USER_AGENT};
pub use error::{ModelError, ModelResult};
pub use google::{GeminiAgentModel, GeminiModel};
pub use mock::{MockReply, MockTransport};
pub use model::{
    Advance, AgentModel, Model, ModelRequestParameters, StreamStructuredResponse,
    StreamTextResponse, StreamedResponse,
};
pub use openai::{OpenAIAgentModel, OpenAIModel};
pub use schema_transformer::JsonSchemaTransformer;
pub use transport::{
    ByteStream, HttpRequest, HttpResponse, HttpTransport, ReqwestTransport, StreamingHttpResponse,
};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        Advance, AgentModel, GeminiModel, HttpTransport, Model, ModelError,
        ModelRequestParameters, ModelResult, OpenAIModel, ProviderConfig, StreamedResponse,
    };
}
