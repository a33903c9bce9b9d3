//! Gemini `generateContent` adapter.
//!
//! Tool schemas are rewritten into the restricted dialect Gemini accepts
//! when the model is bound, and function calls carry no call ids.
//!
//! ## Example
//!
//! ```rust,ignore
//! use modelwire_models::google::GeminiModel;
//! use modelwire_models::{Model, ModelRequestParameters};
//!
//! let model = GeminiModel::from_env("gemini-1.5-flash")?;
//! let agent = model.agent_model(ModelRequestParameters::new().with_allow_text_result(true))?;
//! let streamed = agent.request_stream(&messages, None).await?;
//! ```

pub mod model;
pub mod stream;
pub mod types;

pub use model::{map_content, map_usage, process_response, GeminiAgentModel, GeminiModel};
pub use stream::{GeminiStreamStructured, GeminiStreamText};
pub use types::{
    Candidate, Content, GenerateContentRequest, GenerateContentResponse, Part, PartKind,
    UsageMetadata,
};

/// Create a Gemini model with an explicit API key.
pub fn gemini(
    model_name: impl Into<String>,
    api_key: impl Into<String>,
) -> crate::ModelResult<GeminiModel> {
    GeminiModel::new(model_name, api_key)
}
