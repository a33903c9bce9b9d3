//! Server-Sent Events (SSE) parsing.
//!
//! Delta-protocol providers frame each chunk as an SSE `data:` line. This
//! module turns a raw byte stream into discrete events.

use crate::error::{StreamError, StreamResult};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use pin_project_lite::pin_project;
use serde::de::DeserializeOwned;
use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Maximum number of bytes buffered while waiting for an event boundary.
pub const MAX_BUFFER_SIZE: usize = 10 * 1024 * 1024;

/// A parsed SSE event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// Event type (if specified).
    pub event: Option<String>,
    /// Event data.
    pub data: String,
    /// Event ID (if specified).
    pub id: Option<String>,
    /// Retry timeout (if specified).
    pub retry: Option<u64>,
}

impl SseEvent {
    /// Create a new SSE event with just data.
    pub fn data(data: impl Into<String>) -> Self {
        Self {
            event: None,
            data: data.into(),
            id: None,
            retry: None,
        }
    }

    /// Set the event type.
    pub fn with_event(mut self, event: impl Into<String>) -> Self {
        self.event = Some(event.into());
        self
    }

    /// Check if this is a "done" event (e.g., [DONE]).
    pub fn is_done(&self) -> bool {
        self.data.trim() == "[DONE]" || self.event.as_deref() == Some("done")
    }

    /// Parse the data as JSON.
    pub fn parse_data<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.data)
    }
}

/// Parser for Server-Sent Events streams.
#[derive(Debug)]
pub struct SseParser {
    buffer: String,
    pending_bytes: Vec<u8>,
    events: VecDeque<SseEvent>,
    last_event_id: Option<String>,
    max_buffer: usize,
}

impl Default for SseParser {
    fn default() -> Self {
        Self {
            buffer: String::new(),
            pending_bytes: Vec::new(),
            events: VecDeque::new(),
            last_event_id: None,
            max_buffer: MAX_BUFFER_SIZE,
        }
    }
}

impl SseParser {
    /// Create a new SSE parser.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum buffer size.
    #[must_use]
    pub fn with_max_buffer(mut self, max_buffer: usize) -> Self {
        self.max_buffer = max_buffer;
        self
    }

    /// Feed bytes into the parser.
    ///
    /// A multi-byte character split across two chunks is held back until the
    /// rest of it arrives.
    pub fn feed(&mut self, bytes: &[u8]) -> StreamResult<Vec<SseEvent>> {
        self.pending_bytes.extend_from_slice(bytes);
        let valid = match std::str::from_utf8(&self.pending_bytes) {
            Ok(s) => s.len(),
            Err(e) if e.error_len().is_none() => e.valid_up_to(),
            Err(e) => {
                return Err(StreamError::ParseSse(format!(
                    "invalid UTF-8 at byte {}",
                    e.valid_up_to()
                )))
            }
        };
        let rest = self.pending_bytes.split_off(valid);
        let decoded = String::from_utf8_lossy(&self.pending_bytes).into_owned();
        self.pending_bytes = rest;
        self.feed_str(&decoded)
    }

    /// Feed a string into the parser.
    pub fn feed_str(&mut self, s: &str) -> StreamResult<Vec<SseEvent>> {
        self.buffer.push_str(s);

        if self.buffer.len() > self.max_buffer {
            return Err(StreamError::BufferOverflow {
                limit: self.max_buffer,
            });
        }

        self.parse_buffer()
    }

    /// Call when stream ends to flush any remaining event.
    pub fn finish(&mut self) -> StreamResult<Vec<SseEvent>> {
        if !self.pending_bytes.is_empty() {
            return Err(StreamError::ParseSse(
                "stream ended inside a multi-byte character".to_string(),
            ));
        }

        let mut events = self.parse_buffer()?;

        if !self.buffer.trim().is_empty() {
            if let Some(event) = parse_event(self.buffer.trim_end_matches(['\n', '\r'])) {
                self.record(event.clone());
                events.push(event);
            }
        }

        self.buffer.clear();

        Ok(events)
    }

    /// Get the next parsed event.
    pub fn next_event(&mut self) -> Option<SseEvent> {
        self.events.pop_front()
    }

    /// Check if there are pending events.
    pub fn has_events(&self) -> bool {
        !self.events.is_empty()
    }

    /// Get the last event ID.
    pub fn last_event_id(&self) -> Option<&str> {
        self.last_event_id.as_deref()
    }

    fn record(&mut self, event: SseEvent) {
        if let Some(id) = &event.id {
            self.last_event_id = Some(id.clone());
        }
        self.events.push_back(event);
    }

    fn parse_buffer(&mut self) -> StreamResult<Vec<SseEvent>> {
        let mut parsed_events = Vec::new();

        // Split by blank lines (event boundaries)
        while let Some((pos, delimiter_len)) = self.find_event_boundary() {
            let event_str = self.buffer[..pos].to_string();
            let rest = self.buffer[pos + delimiter_len..]
                .trim_start_matches(['\n', '\r'])
                .to_string();
            self.buffer = rest;

            if let Some(event) = parse_event(&event_str) {
                self.record(event.clone());
                parsed_events.push(event);
            }
        }

        Ok(parsed_events)
    }

    fn find_event_boundary(&self) -> Option<(usize, usize)> {
        let newline = self.buffer.find("\n\n").map(|pos| (pos, 2));
        let carriage = self.buffer.find("\r\n\r\n").map(|pos| (pos, 4));

        match (newline, carriage) {
            (Some(nl), Some(cr)) => Some(if cr.0 < nl.0 { cr } else { nl }),
            (Some(nl), None) => Some(nl),
            (None, Some(cr)) => Some(cr),
            (None, None) => None,
        }
    }
}

fn parse_event(s: &str) -> Option<SseEvent> {
    let mut event = None;
    let mut data_lines = Vec::new();
    let mut id = None;
    let mut retry = None;

    for line in s.lines() {
        if line.is_empty() || line.starts_with(':') {
            // Comment or empty line
            continue;
        }

        if let Some(value) = line.strip_prefix("event:") {
            event = Some(value.trim().to_string());
        } else if let Some(value) = line.strip_prefix("data:") {
            data_lines.push(value.trim_start().to_string());
        } else if let Some(value) = line.strip_prefix("id:") {
            id = Some(value.trim().to_string());
        } else if let Some(value) = line.strip_prefix("retry:") {
            retry = value.trim().parse().ok();
        } else if line == "data" {
            // "data" without colon means empty data line
            data_lines.push(String::new());
        }
    }

    if data_lines.is_empty() {
        return None;
    }

    Some(SseEvent {
        event,
        data: data_lines.join("\n"),
        id,
        retry,
    })
}

pin_project! {
    /// Stream adapter that parses SSE from a byte stream.
    ///
    /// Transport errors pass through untouched; framing errors are converted
    /// into the transport's error type.
    pub struct SseStream<S> {
        #[pin]
        inner: S,
        parser: SseParser,
        finished: bool,
    }
}

impl<S> SseStream<S> {
    /// Create a new SSE stream from a byte stream.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            parser: SseParser::new(),
            finished: false,
        }
    }
}

impl<S, E> Stream for SseStream<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: From<StreamError>,
{
    type Item = Result<SseEvent, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        loop {
            // Return buffered events first
            if let Some(event) = this.parser.next_event() {
                return Poll::Ready(Some(Ok(event)));
            }

            if *this.finished {
                return Poll::Ready(None);
            }

            match this.inner.poll_next_unpin(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    if let Err(error) = this.parser.feed(&bytes) {
                        return Poll::Ready(Some(Err(error.into())));
                    }
                }
                Poll::Ready(Some(Err(e))) => return Poll::Ready(Some(Err(e))),
                Poll::Ready(None) => {
                    *this.finished = true;
                    if let Err(error) = this.parser.finish() {
                        return Poll::Ready(Some(Err(error.into())));
                    }
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    #[test]
    fn test_sse_parser_basic() {
        let mut parser = SseParser::new();
        parser.feed_str("data: hello\n\n").unwrap();

        let event = parser.next_event().unwrap();
        assert_eq!(event.data, "hello");
        assert!(event.event.is_none());
    }

    #[test]
    fn test_sse_parser_with_event_type() {
        let mut parser = SseParser::new();
        parser.feed_str("event: message\ndata: hello\n\n").unwrap();

        let event = parser.next_event().unwrap();
        assert_eq!(event.event, Some("message".to_string()));
        assert_eq!(event.data, "hello");
    }

    #[test]
    fn test_sse_parser_multiline_data() {
        let mut parser = SseParser::new();
        parser.feed_str("data: line1\ndata: line2\n\n").unwrap();

        let event = parser.next_event().unwrap();
        assert_eq!(event.data, "line1\nline2");
    }

    #[test]
    fn test_sse_parser_multiple_events() {
        let mut parser = SseParser::new();
        let events = parser.feed_str("data: first\r\n\r\ndata: second\n\n").unwrap();
        assert_eq!(events.len(), 2);

        assert_eq!(parser.next_event().unwrap().data, "first");
        assert_eq!(parser.next_event().unwrap().data, "second");
        assert!(parser.next_event().is_none());
    }

    #[test]
    fn test_sse_parser_id_retry_and_comments() {
        let mut parser = SseParser::new();
        parser
            .feed_str(": keep-alive\nid: 123\nretry: 5000\ndata: hello\n\n")
            .unwrap();

        let event = parser.next_event().unwrap();
        assert_eq!(event.data, "hello");
        assert_eq!(event.retry, Some(5000));
        assert_eq!(parser.last_event_id(), Some("123"));
    }

    #[test]
    fn test_sse_event_is_done() {
        assert!(SseEvent::data("[DONE]").is_done());
        assert!(!SseEvent::data("hello").is_done());
        assert!(SseEvent::data("x").with_event("done").is_done());
    }

    #[test]
    fn test_sse_parser_incremental() {
        let mut parser = SseParser::new();

        parser.feed_str("data: hel").unwrap();
        assert!(parser.next_event().is_none());

        parser.feed_str("lo\n\n").unwrap();
        assert_eq!(parser.next_event().unwrap().data, "hello");
    }

    #[test]
    fn test_sse_parser_split_multibyte_character() {
        let bytes = "data: caf\u{e9}\n\n".as_bytes();
        let split = bytes.len() - 3;
        let mut parser = SseParser::new();

        parser.feed(&bytes[..split]).unwrap();
        assert!(!parser.has_events());
        parser.feed(&bytes[split..]).unwrap();
        assert_eq!(parser.next_event().unwrap().data, "caf\u{e9}");
    }

    #[test]
    fn test_sse_parser_finish_flushes_trailing_event() {
        let mut parser = SseParser::new();
        parser.feed_str("data: tail").unwrap();
        let events = parser.finish().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "tail");
    }

    #[test]
    fn test_sse_parser_overflow() {
        let mut parser = SseParser::new().with_max_buffer(8);
        let err = parser.feed_str("data: 0123456789").unwrap_err();
        assert!(matches!(err, StreamError::BufferOverflow { limit: 8 }));
    }

    #[tokio::test]
    async fn test_sse_stream() {
        let chunks: Vec<Result<Bytes, StreamError>> = vec![
            Ok(Bytes::from_static(b"data: {\"a\"")),
            Ok(Bytes::from_static(b": 1}\n\ndata: [DONE]\n\n")),
        ];
        let events: Vec<SseEvent> = SseStream::new(stream::iter(chunks))
            .map(|e| e.unwrap())
            .collect()
            .await;

        assert_eq!(events.len(), 2);
        let value: serde_json::Value = events[0].parse_data().unwrap();
        assert_eq!(value["a"], 1);
        assert!(events[1].is_done());
    }

    #[test]
    fn test_sse_stream_surfaces_overflow() {
        let chunks: Vec<Result<Bytes, StreamError>> =
            vec![Ok(Bytes::from_static(b"data: far too long for the limit"))];
        let mut events = SseStream::new(stream::iter(chunks));
        events.parser.max_buffer = 8;

        let first = tokio_test::block_on(events.next());
        assert!(matches!(
            first,
            Some(Err(StreamError::BufferOverflow { limit: 8 }))
        ));
    }
}
