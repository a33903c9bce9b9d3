//! # modelwire-core
//!
//! Canonical message model, cost accounting, settings, and error types shared
//! by every modelwire provider adapter.
//!
//! - **Messages**: the provider-independent conversation representation
//! - **Usage**: additive token [`Cost`] records
//! - **Settings**: per-request [`ModelSettings`]
//! - **Errors**: [`UserError`], [`UnexpectedModelBehavior`], [`MissingToolCallId`]
//!
//! ## Example
//!
//! ```rust
//! use modelwire_core::{Cost, Message, ModelSettings, UserPrompt};
//!
//! let history = vec![Message::from(UserPrompt::new("Hello!"))];
//! assert_eq!(history[0].message_kind(), "user-prompt");
//!
//! let settings = ModelSettings::new().max_tokens(1000).temperature(0.7);
//! assert_eq!(settings.max_tokens, Some(1000));
//!
//! let total = Cost::with_tokens(10, 5, 15) + Cost::with_tokens(1, 1, 2);
//! assert_eq!(total.total_tokens, Some(17));
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod errors;
pub mod identifier;
pub mod messages;
pub mod settings;
pub mod usage;

// Re-exports for convenience
pub use errors::{MissingToolCallId, ModelwireError, Result, UnexpectedModelBehavior, UserError};
pub use identifier::{from_unix_seconds, now_utc};
pub use messages::{
    LocItem, Message, ModelResponse, ModelResponsePart, ModelRole, RetryContent, RetryPrompt,
    Role, SystemPrompt, TextPart, ToolCallArgs, ToolCallPart, ToolReturn, UserPrompt, UserRole,
    ValidationErrorDetail,
};
pub use settings::ModelSettings;
pub use usage::Cost;

/// Prelude module for common imports.
///
/// ```rust
/// use modelwire_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::errors::{
        MissingToolCallId, ModelwireError, Result, UnexpectedModelBehavior, UserError,
    };
    pub use crate::identifier::now_utc;
    pub use crate::messages::{
        Message, ModelResponse, ModelResponsePart, RetryContent, RetryPrompt, Role, SystemPrompt,
        TextPart, ToolCallArgs, ToolCallPart, ToolReturn, UserPrompt, ValidationErrorDetail,
    };
    pub use crate::settings::ModelSettings;
    pub use crate::usage::Cost;
}
