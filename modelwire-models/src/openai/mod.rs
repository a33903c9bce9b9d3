//! OpenAI chat completions adapter.
//!
//! ## Example
//!
//! ```rust,ignore
//! use modelwire_models::openai::OpenAIModel;
//! use modelwire_models::{Model, ModelRequestParameters};
//!
//! let model = OpenAIModel::from_env("gpt-4o")?;
//! let agent = model.agent_model(ModelRequestParameters::new().with_allow_text_result(true))?;
//! let (response, cost) = agent.request(&messages, None).await?;
//! ```

pub mod model;
pub mod stream;
pub mod types;

pub use model::{map_cost, map_message, process_response, OpenAIAgentModel, OpenAIModel};
pub use stream::{OpenAIStreamStructured, OpenAIStreamText};
pub use types::{
    ChatCompletionChunk, ChatCompletionRequest, ChatCompletionResponse, ChatMessage, ChatRole,
    ChatTool, ToolChoice, Usage,
};

/// Create an OpenAI model with an explicit API key.
pub fn chat(
    model_name: impl Into<String>,
    api_key: impl Into<String>,
) -> crate::ModelResult<OpenAIModel> {
    OpenAIModel::new(model_name, api_key)
}
