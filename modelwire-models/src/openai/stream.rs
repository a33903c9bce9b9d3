//! Streaming accumulators for OpenAI chat completions.
//!
//! The response arrives as SSE frames, each carrying a small delta. The first
//! delta with content decides the kind of response: text deltas feed a
//! [`OpenAIStreamText`], tool-call deltas feed a [`OpenAIStreamStructured`].
//! Usage arrives on its own trailing chunk when `include_usage` is set, so
//! both accumulators keep reading past the finish reason.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt};
use indexmap::IndexMap;
use std::pin::Pin;
use tracing::{debug, trace, warn};

use modelwire_core::{from_unix_seconds, Cost, ModelResponse, ModelResponsePart, ToolCallPart};
use modelwire_streaming::SseStream;

use super::model::map_cost;
use super::types::{ChatCompletionChunk, ChunkDelta, ChunkToolCall};
use crate::error::{ModelError, ModelResult};
use crate::model::{Advance, StreamStructuredResponse, StreamTextResponse, StreamedResponse};
use crate::transport::ByteStream;

/// Decoded chunks in arrival order.
pub type ChunkStream = Pin<Box<dyn Stream<Item = ModelResult<ChatCompletionChunk>> + Send>>;

/// Decode an SSE byte stream into chunks, stopping at `[DONE]`.
///
/// Frames that do not decode as a chunk are logged and skipped.
pub fn chunk_stream(body: ByteStream) -> ChunkStream {
    let chunks = SseStream::new(body)
        .take_while(|event| {
            let done = matches!(event, Ok(e) if e.is_done());
            futures::future::ready(!done)
        })
        .filter_map(|event| {
            let chunk = match event {
                Ok(event) => {
                    trace!(bytes = event.data.len(), "OpenAI stream frame");
                    match event.parse_data::<ChatCompletionChunk>() {
                        Ok(chunk) => Some(Ok(chunk)),
                        Err(e) => {
                            warn!("Failed to parse SSE chunk: {} - data: {}", e, event.data);
                            None
                        }
                    }
                }
                Err(e) => Some(Err(e)),
            };
            futures::future::ready(chunk)
        });
    Box::pin(chunks)
}

/// Read chunks until the response can be classified.
pub async fn start_stream(mut chunks: ChunkStream) -> ModelResult<StreamedResponse> {
    let mut first_created = None;
    let mut cost = Cost::default();

    while let Some(chunk) = chunks.next().await {
        let chunk = chunk?;
        let timestamp = *first_created.get_or_insert_with(|| from_unix_seconds(chunk.created));
        cost += map_cost(chunk.usage.as_ref());

        let Some(choice) = chunk.choices.into_iter().next() else {
            continue;
        };
        let ChunkDelta {
            content,
            tool_calls,
            ..
        } = choice.delta;

        // Some servers send `"content": ""` next to the first tool call.
        if let Some(tool_calls) = tool_calls.filter(|calls| !calls.is_empty()) {
            debug!("Classified OpenAI stream as structured");
            let mut structured = OpenAIStreamStructured {
                chunks,
                tool_calls: IndexMap::new(),
                timestamp,
                cost,
                done: false,
            };
            structured.merge(tool_calls);
            return Ok(StreamedResponse::Structured(Box::new(structured)));
        }
        if let Some(content) = content.filter(|content| !content.is_empty()) {
            debug!("Classified OpenAI stream as text");
            return Ok(StreamedResponse::Text(Box::new(OpenAIStreamText {
                chunks,
                first: Some(content),
                buffer: Vec::new(),
                timestamp,
                cost,
                done: false,
            })));
        }
    }

    Err(ModelError::unexpected(
        "Streamed response ended without content or tool calls",
    ))
}

/// Pull the next chunk, adding its usage to `cost`.
///
/// Returns `None` at transport end or on a chunk without choices.
async fn next_delta(
    chunks: &mut ChunkStream,
    cost: &mut Cost,
) -> ModelResult<Option<ChunkDelta>> {
    let Some(chunk) = chunks.next().await else {
        return Ok(None);
    };
    let chunk = chunk?;
    *cost += map_cost(chunk.usage.as_ref());
    Ok(chunk.choices.into_iter().next().map(|choice| choice.delta))
}

/// A streamed text response.
pub struct OpenAIStreamText {
    chunks: ChunkStream,
    first: Option<String>,
    buffer: Vec<String>,
    timestamp: DateTime<Utc>,
    cost: Cost,
    done: bool,
}

#[async_trait]
impl StreamTextResponse for OpenAIStreamText {
    async fn advance(&mut self) -> ModelResult<Advance> {
        if let Some(first) = self.first.take() {
            self.buffer.push(first);
            return Ok(Advance::Chunk);
        }
        if self.done {
            return Ok(Advance::End);
        }

        let Some(delta) = next_delta(&mut self.chunks, &mut self.cost).await? else {
            self.done = true;
            return Ok(Advance::End);
        };
        if delta.tool_calls.is_some_and(|calls| !calls.is_empty()) {
            return Err(ModelError::unexpected(
                "Expected content in streamed text response, got tool calls",
            ));
        }
        if let Some(content) = delta.content {
            self.buffer.push(content);
        }
        Ok(Advance::Chunk)
    }

    fn materialize(&mut self, _is_final: bool) -> ModelResult<Vec<String>> {
        Ok(std::mem::take(&mut self.buffer))
    }

    fn cost(&self) -> Cost {
        self.cost.clone()
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Tool call fragments merged by index.
#[derive(Debug, Default)]
struct ToolCallDelta {
    id: Option<String>,
    name: Option<String>,
    arguments: Option<String>,
}

fn append(target: &mut Option<String>, fragment: Option<String>) {
    if let Some(fragment) = fragment {
        target.get_or_insert_with(String::new).push_str(&fragment);
    }
}

/// A streamed tool-call response.
pub struct OpenAIStreamStructured {
    chunks: ChunkStream,
    tool_calls: IndexMap<u32, ToolCallDelta>,
    timestamp: DateTime<Utc>,
    cost: Cost,
    done: bool,
}

impl OpenAIStreamStructured {
    fn merge(&mut self, fragments: Vec<ChunkToolCall>) {
        for fragment in fragments {
            let current = self.tool_calls.entry(fragment.index).or_default();
            if current.id.is_none() {
                current.id = fragment.id;
            }
            if let Some(function) = fragment.function {
                append(&mut current.name, function.name);
                append(&mut current.arguments, function.arguments);
            }
        }
    }
}

#[async_trait]
impl StreamStructuredResponse for OpenAIStreamStructured {
    async fn advance(&mut self) -> ModelResult<Advance> {
        if self.done {
            return Ok(Advance::End);
        }

        let Some(delta) = next_delta(&mut self.chunks, &mut self.cost).await? else {
            self.done = true;
            return Ok(Advance::End);
        };
        if delta.content.is_some_and(|content| !content.is_empty()) {
            return Err(ModelError::unexpected(
                "Expected tool calls in streamed structured response, got content",
            ));
        }
        self.merge(delta.tool_calls.unwrap_or_default());
        Ok(Advance::Chunk)
    }

    fn materialize(&mut self, _is_final: bool) -> ModelResult<ModelResponse> {
        let parts = self
            .tool_calls
            .values()
            .filter_map(|call| match (&call.name, &call.arguments) {
                (Some(name), Some(arguments)) => Some(ModelResponsePart::ToolCall(
                    ToolCallPart::from_json(name, arguments, call.id.clone()),
                )),
                _ => None,
            })
            .collect();
        Ok(ModelResponse::new(parts).with_timestamp(self.timestamp))
    }

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
    use crate::mock::MockTransport;
    use crate::model::{Model, ModelRequestParameters};
    use crate::openai::OpenAIModel;
    use crate::ProviderConfig;
    use modelwire_core::UserPrompt;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn frame(chunk: Value) -> String {
        format!("data: {}\n\n", chunk)
    }

    fn content(text: &str) -> String {
        frame(json!({
            "id": "c", "created": 1_700_000_000, "model": "gpt-4o",
            "choices": [{"index": 0, "delta": {"content": text}, "finish_reason": null}]
        }))
    }

    fn tool_delta(call: Value) -> String {
        frame(json!({
            "id": "c", "created": 1_700_000_000, "model": "gpt-4o",
            "choices": [{"index": 0, "delta": {"tool_calls": [call]}, "finish_reason": null}]
        }))
    }

    fn finish(reason: &str) -> String {
        frame(json!({
            "id": "c", "created": 1_700_000_000, "model": "gpt-4o",
            "choices": [{"index": 0, "delta": {}, "finish_reason": reason}]
        }))
    }

    fn usage(prompt: u64, completion: u64) -> String {
        frame(json!({
            "id": "c", "created": 1_700_000_000, "model": "gpt-4o", "choices": [],
            "usage": {"prompt_tokens": prompt, "completion_tokens": completion, "total_tokens": prompt + completion}
        }))
    }

    async fn stream(chunks: Vec<String>) -> ModelResult<StreamedResponse> {
        let transport = MockTransport::new().with_chunks(200, chunks);
        let model = OpenAIModel::from_config(
            "gpt-4o",
            ProviderConfig::new().with_api_key("k"),
            Arc::new(transport.clone()),
        )
        .unwrap();
        let agent = model
            .agent_model(ModelRequestParameters::new().with_allow_text_result(true))
            .unwrap();
        let response = agent.request_stream(&[UserPrompt::new("Hi").into()], None).await;
        let body = transport.last_body().unwrap();
        assert_eq!(body["stream"], json!(true));
        assert_eq!(body["stream_options"], json!({"include_usage": true}));
        response
    }

    #[tokio::test]
    async fn test_text_deltas() {
        let response = stream(vec![
            content("Hello"),
            content(" world"),
            finish("stop"),
            usage(5, 2),
            "data: [DONE]\n\n".to_string(),
        ])
        .await
        .unwrap();
        let mut text = response.into_text().unwrap();

        let mut fragments = Vec::new();
        while text.advance().await.unwrap() == Advance::Chunk {
            fragments.push(text.materialize(false).unwrap());
        }
        fragments.push(text.materialize(true).unwrap());

        assert_eq!(fragments[0], vec!["Hello".to_string()]);
        assert_eq!(fragments[1], vec![" world".to_string()]);
        assert_eq!(fragments.concat().concat(), "Hello world");
        assert!(text.materialize(true).unwrap().is_empty());
        assert_eq!(text.cost(), Cost::with_tokens(5, 2, 7));
        assert_eq!(text.timestamp(), from_unix_seconds(1_700_000_000));
        assert_eq!(text.advance().await.unwrap(), Advance::End);
    }

    #[tokio::test]
    async fn test_tool_call_fragments_merge() {
        let response = stream(vec![
            tool_delta(json!({"index": 0, "id": "call_1", "type": "function", "function": {"name": "foo"}})),
            tool_delta(json!({"index": 0, "function": {"arguments": "{"}})),
            tool_delta(json!({"index": 0, "id": "ignored", "function": {"arguments": "}"}})),
            finish("tool_calls"),
            usage(3, 4),
        ])
        .await
        .unwrap();
        let mut structured = response.into_structured().unwrap();

        let partial = structured.materialize(false).unwrap();
        assert!(partial.parts.is_empty());

        while structured.advance().await.unwrap() == Advance::Chunk {}
        let response = structured.materialize(true).unwrap();

        assert_eq!(
            response.parts,
            vec![ModelResponsePart::ToolCall(ToolCallPart::from_json(
                "foo",
                "{}",
                Some("call_1".to_string())
            ))]
        );
        assert_eq!(structured.cost(), Cost::with_tokens(3, 4, 7));
    }

    #[tokio::test]
    async fn test_parallel_tool_calls_keep_order() {
        let response = stream(vec![
            tool_delta(json!({"index": 0, "id": "a", "function": {"name": "first", "arguments": ""}})),
            tool_delta(json!({"index": 1, "id": "b", "function": {"name": "second", "arguments": "{\"x\":1}"}})),
            tool_delta(json!({"index": 0, "function": {"arguments": "{}"}})),
        ])
        .await
        .unwrap();
        let mut structured = response.into_structured().unwrap();
        while structured.advance().await.unwrap() == Advance::Chunk {}

        let names: Vec<String> = structured
            .materialize(true)
            .unwrap()
            .tool_call_parts()
            .map(|c| c.tool_name.clone())
            .collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_empty_content_beside_tool_call_is_structured() {
        let first = frame(json!({
            "id": "c", "created": 1_700_000_000, "model": "gpt-4o",
            "choices": [{"index": 0, "delta": {
                "role": "assistant",
                "content": "",
                "tool_calls": [{"index": 0, "id": "call_1", "type": "function", "function": {"name": "foo", "arguments": "{}"}}]
            }, "finish_reason": null}]
        }));
        let response = stream(vec![first, finish("tool_calls")]).await.unwrap();
        let mut structured = response.into_structured().unwrap();
        while structured.advance().await.unwrap() == Advance::Chunk {}

        assert_eq!(
            structured.materialize(true).unwrap().parts,
            vec![ModelResponsePart::ToolCall(ToolCallPart::from_json(
                "foo",
                "{}",
                Some("call_1".to_string())
            ))]
        );
    }

    #[tokio::test]
    async fn test_leading_empty_content_waits_for_text() {
        let response = stream(vec![content(""), content("Hi"), finish("stop")])
            .await
            .unwrap();
        let mut text = response.into_text().unwrap();
        while text.advance().await.unwrap() == Advance::Chunk {}
        assert_eq!(text.materialize(true).unwrap().concat(), "Hi");
    }

    #[tokio::test]
    async fn test_empty_stream_is_unexpected() {
        let err = stream(vec![finish("stop"), usage(1, 0)]).await.unwrap_err();
        assert!(matches!(err, ModelError::UnexpectedBehavior(ref e) if e.message.contains("without content or tool calls")));
    }

    #[tokio::test]
    async fn test_conflicting_delta_kind() {
        let response = stream(vec![
            content("Hi"),
            tool_delta(json!({"index": 0, "id": "a", "function": {"name": "f", "arguments": "{}"}})),
        ])
        .await
        .unwrap();
        let mut text = response.into_text().unwrap();
        assert_eq!(text.advance().await.unwrap(), Advance::Chunk);
        assert!(matches!(
            text.advance().await,
            Err(ModelError::UnexpectedBehavior(_))
        ));
    }

    #[tokio::test]
    async fn test_undecodable_frame_is_skipped() {
        let response = stream(vec![
            "data: {not json}\n\n".to_string(),
            content("ok"),
        ])
        .await
        .unwrap();
        assert!(response.is_text());
    }

    #[tokio::test]
    async fn test_error_status_drains_body() {
        let transport = MockTransport::new().with_chunks(500, ["{\"error\": ", "{\"message\": \"boom\"}}"]);
        let model = OpenAIModel::from_config(
            "gpt-4o",
            ProviderConfig::new().with_api_key("k"),
            Arc::new(transport),
        )
        .unwrap();
        let agent = model.agent_model(ModelRequestParameters::new()).unwrap();
        let err = agent.request_stream(&[UserPrompt::new("Hi").into()], None).await.unwrap_err();
        assert!(matches!(err, ModelError::Api { ref message, .. } if message == "boom"));
    }
}
