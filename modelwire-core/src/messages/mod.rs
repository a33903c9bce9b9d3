//! Message types for model interactions.
//!
//! A conversation is an ordered list of [`Message`]s. Four kinds flow toward
//! the model ([`SystemPrompt`], [`UserPrompt`], [`ToolReturn`], [`RetryPrompt`])
//! and one flows back ([`ModelResponse`]).
//!
//! Every message serializes with a `message_kind` discriminator and an explicit
//! `role`, and a message list survives a JSON round trip unchanged.
//!
//! ## Example
//!
//! ```rust
//! use modelwire_core::messages::{Message, ModelResponse, SystemPrompt, UserPrompt};
//!
//! let history = vec![
//!     Message::from(SystemPrompt::new("You are a helpful assistant.")),
//!     Message::from(UserPrompt::new("Hello!")),
//!     Message::from(ModelResponse::from_text("Hi! How can I help?")),
//! ];
//!
//! let json = modelwire_core::messages::messages_to_json(&history).unwrap();
//! let restored = modelwire_core::messages::messages_from_json(&json).unwrap();
//! assert_eq!(history, restored);
//! ```

pub mod parts;
pub mod request;
pub mod response;
pub mod role;

use serde::{Deserialize, Serialize};

pub use parts::{TextPart, ToolCallArgs, ToolCallPart};
pub use request::{
    LocItem, RetryContent, RetryPrompt, SystemPrompt, ToolReturn, UserPrompt,
    ValidationErrorDetail,
};
pub use response::{ModelResponse, ModelResponsePart};
pub use role::{ModelRole, Role, UserRole};

/// Any message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "message_kind", rename_all = "kebab-case")]
pub enum Message {
    /// System instructions.
    SystemPrompt(SystemPrompt),
    /// User input.
    UserPrompt(UserPrompt),
    /// Result of a tool call.
    ToolReturn(ToolReturn),
    /// Request to retry.
    RetryPrompt(RetryPrompt),
    /// Model output.
    ModelResponse(ModelResponse),
}

impl Message {
    /// The role of this message.
    #[must_use]
    pub fn role(&self) -> Role {
        match self {
            Self::SystemPrompt(m) => m.role.role(),
            Self::UserPrompt(m) => m.role.role(),
            Self::ToolReturn(m) => m.role.role(),
            Self::RetryPrompt(m) => m.role.role(),
            Self::ModelResponse(m) => m.role.role(),
        }
    }

    /// The `message_kind` discriminator.
    #[must_use]
    pub fn message_kind(&self) -> &'static str {
        match self {
            Self::SystemPrompt(_) => SystemPrompt::MESSAGE_KIND,
            Self::UserPrompt(_) => UserPrompt::MESSAGE_KIND,
            Self::ToolReturn(_) => ToolReturn::MESSAGE_KIND,
            Self::RetryPrompt(_) => RetryPrompt::MESSAGE_KIND,
            Self::ModelResponse(_) => ModelResponse::MESSAGE_KIND,
        }
    }

    /// Whether this message flows toward the model.
    #[must_use]
    pub fn is_request(&self) -> bool {
        self.role() == Role::User
    }

    /// The response, if this message is one.
    #[must_use]
    pub fn as_response(&self) -> Option<&ModelResponse> {
        match self {
            Self::ModelResponse(r) => Some(r),
            _ => None,
        }
    }
}

macro_rules! impl_from_message {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for Message {
                fn from(m: $variant) -> Self {
                    Self::$variant(m)
                }
            }
        )*
    };
}

impl_from_message!(SystemPrompt, UserPrompt, ToolReturn, RetryPrompt, ModelResponse);

/// Serialize a message list to JSON.
pub fn messages_to_json(messages: &[Message]) -> serde_json::Result<String> {
    serde_json::to_string(messages)
}

/// Deserialize a message list from JSON.
pub fn messages_from_json(json: &str) -> serde_json::Result<Vec<Message>> {
    serde_json::from_str(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::from_unix_seconds;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    fn history() -> Vec<Message> {
        let ts = from_unix_seconds(1_700_000_000);
        vec![
            SystemPrompt::new("Be terse.").into(),
            UserPrompt::new("Weather in Paris?").with_timestamp(ts).into(),
            ModelResponse::new(vec![
                ModelResponsePart::text("Checking."),
                ModelResponsePart::ToolCall(ToolCallPart::from_json(
                    "get_weather",
                    "{\"city\":\"Paris\"}",
                    Some("call_1".into()),
                )),
            ])
            .with_timestamp(ts)
            .into(),
            ToolReturn::new("get_weather", json!({"temp": 21}))
                .with_tool_call_id("call_1")
                .with_timestamp(ts)
                .into(),
            RetryPrompt::new(vec![ValidationErrorDetail::new(
                "missing",
                vec!["city".into()],
                "Field required",
                json!({}),
            )])
            .with_tool_name("get_weather")
            .with_timestamp(ts)
            .into(),
            RetryPrompt::new("Answer in one word.").with_timestamp(ts).into(),
        ]
    }

    #[test]
    fn test_roundtrip() {
        let messages = history();
        let json = messages_to_json(&messages).unwrap();
        let restored = messages_from_json(&json).unwrap();
        assert_eq!(messages, restored);
    }

    #[test]
    fn test_wire_discriminators() {
        let json: Value = serde_json::from_str(&messages_to_json(&history()).unwrap()).unwrap();
        let kinds: Vec<&str> = json
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["message_kind"].as_str().unwrap())
            .collect();
        assert_eq!(
            kinds,
            vec![
                "system-prompt",
                "user-prompt",
                "model-response",
                "tool-return",
                "retry-prompt",
                "retry-prompt"
            ]
        );
        assert_eq!(json[0]["role"], "user");
        assert_eq!(json[2]["role"], "model");
        assert_eq!(json[2]["parts"][1]["part_kind"], "tool-call");
    }

    #[test]
    fn test_role_and_kind() {
        for message in history() {
            let expected = if message.message_kind() == "model-response" {
                Role::Model
            } else {
                Role::User
            };
            assert_eq!(message.role(), expected);
            assert_eq!(message.is_request(), expected == Role::User);
        }
    }

    #[test]
    fn test_rejects_mismatched_role() {
        let bad = r#"[{"message_kind": "user-prompt", "content": "hi", "role": "model"}]"#;
        assert!(messages_from_json(bad).is_err());
    }

    #[test]
    fn test_missing_timestamp_defaults() {
        let json = r#"[{"message_kind": "user-prompt", "content": "hi"}]"#;
        let messages = messages_from_json(json).unwrap();
        assert_eq!(messages[0].role(), Role::User);
    }
}
