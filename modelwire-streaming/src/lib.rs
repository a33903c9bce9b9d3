//! # modelwire-streaming
//!
//! Decoding support for streamed provider responses.
//!
//! - **[`SseParser`]** / **[`SseStream`]**: split a byte stream into Server-Sent Events
//! - **[`parse_json`]**: parse a JSON document that is still arriving
//!
//! ## Example - SSE Parsing
//!
//! ```rust
//! use modelwire_streaming::SseParser;
//!
//! let mut parser = SseParser::new();
//! parser.feed_str("data: {\"content\": \"hello\"}\n\n").unwrap();
//!
//! let event = parser.next_event().unwrap();
//! assert_eq!(event.data, "{\"content\": \"hello\"}");
//! ```
//!
//! ## Example - Partial JSON
//!
//! ```rust
//! use modelwire_streaming::{parse_json, ParseMode};
//! use serde_json::json;
//!
//! let value = parse_json(b"[{\"text\": \"Hel", ParseMode::BestEffort).unwrap();
//! assert_eq!(value, Some(json!([{"text": "Hel"}])));
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod partial_json;
pub mod sse;

// Re-exports
pub use error::{StreamError, StreamResult};
pub use partial_json::{parse_best_effort, parse_json, parse_strict, ParseMode};
pub use sse::{SseEvent, SseParser, SseStream};
