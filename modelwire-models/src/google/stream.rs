//! Streaming accumulators for Gemini.
//!
//! `streamGenerateContent` returns one JSON array that grows with every
//! network chunk; each element is a complete response object with its own
//! usage. The accumulators keep the raw bytes and re-parse them on demand,
//! best-effort while the stream is live and strictly once it has ended.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde_json::Value as JsonValue;
use tracing::{debug, trace};

use modelwire_core::{now_utc, Cost, ModelResponse};
use modelwire_streaming::{parse_json, ParseMode};

use super::model::{map_usage, process_parts};
use super::types::{GenerateContentResponse, Part, PartKind};
use crate::error::{ModelError, ModelResult};
use crate::model::{Advance, StreamStructuredResponse, StreamTextResponse, StreamedResponse};
use crate::transport::ByteStream;

fn parse_mode(is_final: bool) -> ParseMode {
    if is_final {
        ParseMode::Strict
    } else {
        ParseMode::BestEffort
    }
}

/// Parse the buffer as the top-level array of response objects.
fn parse_elements(buffer: &[u8], mode: ParseMode) -> ModelResult<Vec<JsonValue>> {
    match parse_json(buffer, mode)? {
        None => Ok(Vec::new()),
        Some(JsonValue::Array(items)) => Ok(items),
        Some(_) => Err(ModelError::unexpected(
            "Expected a JSON array in streamed Gemini response",
        )),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamKind {
    Text,
    Structured,
}

/// Decide the response kind from the latest array element, if possible yet.
fn classify(buffer: &[u8]) -> ModelResult<Option<StreamKind>> {
    let Some(last) = parse_elements(buffer, ParseMode::BestEffort)?.pop() else {
        return Ok(None);
    };
    // A truncated element may be missing required keys.
    let Ok(last) = serde_json::from_value::<GenerateContentResponse>(last) else {
        return Ok(None);
    };
    let parts = match last.candidates.as_slice() {
        [] => return Ok(None),
        [candidate] => candidate.parts(),
        _ => {
            return Err(ModelError::unexpected(
                "Expected exactly one candidate in Gemini response",
            ))
        }
    };
    if parts.is_empty() || parts.iter().any(|p| p.kind() == PartKind::Unknown) {
        return Ok(None);
    }

    if parts.iter().all(|p| p.kind() == PartKind::FunctionCall) {
        Ok(Some(StreamKind::Structured))
    } else if parts.iter().all(|p| p.kind() == PartKind::Text) {
        Ok(Some(StreamKind::Text))
    } else {
        Err(ModelError::unexpected(format!(
            "Unsupported response from Gemini, expected all parts to be function calls or text, got: {:?}",
            parts
        )))
    }
}

/// Read chunks until the response can be classified.
pub async fn start_stream(mut body: ByteStream) -> ModelResult<StreamedResponse> {
    let mut buffer = Vec::new();

    while let Some(chunk) = body.next().await {
        buffer.extend_from_slice(&chunk?);
        trace!(bytes = buffer.len(), "Gemini stream buffer");

        match classify(&buffer)? {
            None => continue,
            Some(StreamKind::Text) => {
                debug!("Classified Gemini stream as text");
                return Ok(StreamedResponse::Text(Box::new(GeminiStreamText {
                    body,
                    buffer,
                    position: 0,
                    timestamp: now_utc(),
                    cost: Cost::default(),
                })));
            }
            Some(StreamKind::Structured) => {
                debug!("Classified Gemini stream as structured");
                return Ok(StreamedResponse::Structured(Box::new(
                    GeminiStreamStructured {
                        body,
                        buffer,
                        timestamp: now_utc(),
                        cost: Cost::default(),
                    },
                )));
            }
        }
    }

    Err(ModelError::unexpected(
        "Streamed response ended without content or tool calls",
    ))
}

async fn read_chunk(body: &mut ByteStream, buffer: &mut Vec<u8>) -> ModelResult<Advance> {
    match body.next().await {
        Some(chunk) => {
            buffer.extend_from_slice(&chunk?);
            trace!(bytes = buffer.len(), "Gemini stream buffer");
            Ok(Advance::Chunk)
        }
        None => Ok(Advance::End),
    }
}

/// A streamed text response.
///
/// Tracks how many array elements have been reported. While live, the last
/// element is held back since it may still be growing.
pub struct GeminiStreamText {
    body: ByteStream,
    buffer: Vec<u8>,
    position: usize,
    timestamp: DateTime<Utc>,
    cost: Cost,
}

impl GeminiStreamText {
    fn text_of(&mut self, item: JsonValue, out: &mut Vec<String>) -> ModelResult<()> {
        let response: GenerateContentResponse = serde_json::from_value(item)?;
        self.cost += map_usage(&response);

        let candidate = match response.candidates.as_slice() {
            [] => return Ok(()),
            [candidate] => candidate,
            _ => {
                return Err(ModelError::unexpected(
                    "Expected exactly one candidate in Gemini response",
                ))
            }
        };
        for part in candidate.parts() {
            match (&part.text, part.kind()) {
                (Some(text), PartKind::Text) => out.push(text.clone()),
                _ => {
                    return Err(ModelError::unexpected(
                        "Streamed response with unexpected content, expected all parts to be text",
                    ))
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl StreamTextResponse for GeminiStreamText {
    async fn advance(&mut self) -> ModelResult<Advance> {
        read_chunk(&mut self.body, &mut self.buffer).await
    }

    fn materialize(&mut self, is_final: bool) -> ModelResult<Vec<String>> {
        let items = parse_elements(&self.buffer, parse_mode(is_final))?;
        let end = if is_final {
            items.len()
        } else {
            items.len().saturating_sub(1)
        };

        let mut fragments = Vec::new();
        let start = self.position;
        for item in items.into_iter().take(end).skip(start) {
            self.text_of(item, &mut fragments)?;
        }
        self.position = self.position.max(end);
        Ok(fragments)
    }

    /// Usage of the elements reported so far.
    fn cost(&self) -> Cost {
        self.cost.clone()
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// A streamed function-call response.
///
/// Every materialization rebuilds the response from the whole buffer. Parts
/// of every array element are merged into one response, which matches how
/// Gemini has been observed to split calls but is not a documented guarantee.
pub struct GeminiStreamStructured {
    body: ByteStream,
    buffer: Vec<u8>,
    timestamp: DateTime<Utc>,
    cost: Cost,
}

#[async_trait]
impl StreamStructuredResponse for GeminiStreamStructured {
    async fn advance(&mut self) -> ModelResult<Advance> {
        read_chunk(&mut self.body, &mut self.buffer).await
    }

    fn materialize(&mut self, is_final: bool) -> ModelResult<ModelResponse> {
        let items = parse_elements(&self.buffer, parse_mode(is_final))?;

        let mut cost = Cost::default();
        let mut parts: Vec<Part> = Vec::new();
        for item in items {
            let response = match serde_json::from_value::<GenerateContentResponse>(item) {
                Ok(response) => response,
                Err(e) if !is_final => {
                    trace!(error = %e, "Skipping incomplete Gemini stream element");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            cost += map_usage(&response);

            let Some(content) = response
                .candidates
                .into_iter()
                .next()
                .and_then(|candidate| candidate.content)
            else {
                continue;
            };
            parts.extend(
                content
                    .parts
                    .into_iter()
                    .filter(|part| is_final || part.kind() != PartKind::Unknown),
            );
        }

        self.cost = cost;
        process_parts(&parts, Some(self.timestamp))
    }

    /// Usage of every element in the buffer, as of the last materialization.
    fn cost(&self) -> Cost {
        self.cost.clone()
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::google::GeminiModel;
    use crate::mock::MockTransport;
    use crate::model::{Model, ModelRequestParameters};
    use crate::ProviderConfig;
    use modelwire_core::{ModelResponsePart, UserPrompt};
    use modelwire_streaming::StreamError;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;
    use std::sync::Arc;

    async fn stream(chunks: Vec<&str>) -> ModelResult<StreamedResponse> {
        let transport = MockTransport::new().with_chunks(200, chunks);
        let model = GeminiModel::from_config(
            "gemini-1.5-flash",
            ProviderConfig::new().with_api_key("g-key"),
            Arc::new(transport.clone()),
        )
        .unwrap();
        let agent = model
            .agent_model(ModelRequestParameters::new().with_allow_text_result(true))
            .unwrap();
        let result = agent
            .request_stream(&[UserPrompt::new("Hi").into()], None)
            .await;
        assert!(transport.requests()[0]
            .url
            .ends_with("gemini-1.5-flash:streamGenerateContent"));
        result
    }

    const HELLO: &str = r#"[{"candidates": [{"content": {"role": "model", "parts": [{"text": "Hello "}]}}], "usageMetadata": {"promptTokenCount": 3, "candidatesTokenCount": 1, "totalTokenCount": 4}}"#;
    const WORLD: &str = r#",
{"candidates": [{"content": {"role": "model", "parts": [{"text": "world"}]}}], "usageMetadata": {"promptTokenCount": 3, "candidatesTokenCount": 2, "totalTokenCount": 5}}"#;

    #[tokio::test]
    async fn test_text_stream_holds_back_last_element() {
        let mut text = stream(vec![HELLO, WORLD, "]"]).await.unwrap().into_text().unwrap();

        assert!(text.materialize(false).unwrap().is_empty());
        assert_eq!(text.advance().await.unwrap(), Advance::Chunk);
        assert_eq!(text.materialize(false).unwrap(), vec!["Hello ".to_string()]);
        assert_eq!(text.cost(), Cost::with_tokens(3, 1, 4));
        assert!(text.materialize(false).unwrap().is_empty());

        assert_eq!(text.advance().await.unwrap(), Advance::Chunk);
        assert_eq!(text.advance().await.unwrap(), Advance::End);
        assert_eq!(text.materialize(true).unwrap(), vec!["world".to_string()]);
        assert_eq!(text.cost(), Cost::with_tokens(6, 3, 9));
        assert!(text.materialize(true).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_text_stream_final_parse_is_strict() {
        let mut text = stream(vec![HELLO, WORLD]).await.unwrap().into_text().unwrap();
        assert_eq!(text.advance().await.unwrap(), Advance::Chunk);
        assert_eq!(text.materialize(false).unwrap(), vec!["Hello ".to_string()]);
        assert_eq!(text.advance().await.unwrap(), Advance::End);

        let err = text.materialize(true).unwrap_err();
        assert!(matches!(err, ModelError::Stream(StreamError::Json(_))));
    }

    #[tokio::test]
    async fn test_text_stream_rejects_function_call() {
        let call = r#",
{"candidates": [{"content": {"role": "model", "parts": [{"functionCall": {"name": "f", "args": {}}}]}}]}]"#;
        let mut text = stream(vec![HELLO, call]).await.unwrap().into_text().unwrap();
        text.advance().await.unwrap();

        let err = text.materialize(true).unwrap_err();
        assert!(matches!(
            err,
            ModelError::UnexpectedBehavior(ref e) if e.message.starts_with("Streamed response with unexpected content")
        ));
    }

    #[tokio::test]
    async fn test_structured_stream_merges_and_recomputes_cost() {
        let chunks = vec![
            r#"[{"candidates": [{"content": {"role": "model", "parts": [{"functionCall": {"name": "get_weather", "args": {"city": "Par"#,
            r#"is"}}}]}}], "usageMetadata": {"promptTokenCount": 5, "candidatesTokenCount": 3, "totalTokenCount": 8}}]"#,
        ];
        let mut structured = stream(chunks).await.unwrap().into_structured().unwrap();

        let partial = structured.materialize(false).unwrap();
        let call = partial.tool_call_parts().next().unwrap();
        assert_eq!(call.tool_name, "get_weather");
        assert_eq!(call.args.to_dict().unwrap()["city"], json!("Par"));

        assert_eq!(structured.advance().await.unwrap(), Advance::Chunk);
        assert_eq!(structured.advance().await.unwrap(), Advance::End);
        let response = structured.materialize(true).unwrap();
        assert_eq!(
            response.parts,
            vec![ModelResponsePart::ToolCall(modelwire_core::ToolCallPart::from_dict(
                "get_weather",
                json!({"city": "Paris"}).as_object().unwrap().clone(),
                None,
            ))]
        );
        assert_eq!(response.timestamp, structured.timestamp());
        assert_eq!(structured.cost(), Cost::with_tokens(5, 3, 8));

        structured.materialize(true).unwrap();
        assert_eq!(structured.cost(), Cost::with_tokens(5, 3, 8));
    }

    #[tokio::test]
    async fn test_priming_waits_for_a_named_call() {
        let chunks = vec![
            r#"[{"candidates": [{"content": {"role": "model", "parts": [{"functionCall": {"na"#,
            r#"me": "search", "args": {"q": "rust"}}}]}}]}]"#,
        ];
        let structured = stream(chunks).await.unwrap();
        assert!(!structured.is_text());
    }

    #[rstest]
    #[case::empty_array(vec!["[", "]"], "Streamed response ended without content or tool calls")]
    #[case::no_bytes(vec![], "Streamed response ended without content or tool calls")]
    #[case::mixed_parts(
        vec![r#"[{"candidates": [{"content": {"role": "model", "parts": [{"text": "a"}, {"functionCall": {"name": "f", "args": {}}}]}}]}]"#],
        "Unsupported response from Gemini"
    )]
    #[case::not_an_array(vec![r#"{"candidates": []}"#], "Expected a JSON array in streamed Gemini response")]
    #[tokio::test]
    async fn test_priming_failures(#[case] chunks: Vec<&str>, #[case] expected: &str) {
        let err = stream(chunks).await.unwrap_err();
        assert!(
            matches!(err, ModelError::UnexpectedBehavior(ref e) if e.message.starts_with(expected)),
            "{err}"
        );
    }
}
