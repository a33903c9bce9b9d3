//! # modelwire-tools
//!
//! Tool definitions handed to model adapters.
//!
//! ```rust
//! use modelwire_tools::{ObjectJsonSchema, ToolDefinition};
//! use serde_json::json;
//!
//! let tool = ToolDefinition::new("get_weather", "Get current weather for a location")
//!     .with_parameters(
//!         ObjectJsonSchema::new().with_property("location", json!({"type": "string"}), true),
//!     );
//! assert_eq!(tool.name(), "get_weather");
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod definition;

pub use definition::{ObjectJsonSchema, ToolDefinition};
