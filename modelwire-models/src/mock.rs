//! In-memory transport for testing.
//!
//! [`MockTransport`] replays queued replies in order and records every request
//! it receives, so adapter tests can assert on the exact wire payload without
//! a network.
//!
//! ```rust
//! use modelwire_models::mock::MockTransport;
//!
//! let transport = MockTransport::new()
//!     .with_json(200, r#"{"ok": true}"#)
//!     .with_chunks(200, ["data: {}\n\n", "data: [DONE]\n\n"]);
//! assert_eq!(transport.pending(), 2);
//! ```

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::HeaderMap;
use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{ModelError, ModelResult};
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, StreamingHttpResponse};

/// One canned reply.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// A status and body delivered as chunks; a chunk may be a transport failure.
    Chunks {
        /// Status code.
        status: u16,
        /// Body chunks in order. `Err` yields a connection error at that point.
        chunks: Vec<Result<Bytes, String>>,
    },
    /// Fail before any response arrives.
    ConnectionError(String),
}

/// A transport that replays queued replies.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    requests: Arc<Mutex<Vec<HttpRequest>>>,
}

impl MockTransport {
    /// Create a transport with no queued replies.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply.
    #[must_use]
    pub fn with_reply(self, reply: MockReply) -> Self {
        self.replies.lock().push_back(reply);
        self
    }

    /// Queue a single-chunk reply.
    #[must_use]
    pub fn with_json(self, status: u16, body: impl Into<String>) -> Self {
        let body: String = body.into();
        self.with_reply(MockReply::Chunks {
            status,
            chunks: vec![Ok(Bytes::from(body))],
        })
    }

    /// Queue a reply delivered as the given chunks.
    #[must_use]
    pub fn with_chunks<I, C>(self, status: u16, chunks: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<String>,
    {
        let chunks = chunks
            .into_iter()
            .map(|c| Ok(Bytes::from(c.into())))
            .collect();
        self.with_reply(MockReply::Chunks { status, chunks })
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    /// The most recent request body, parsed as JSON.
    pub fn last_body(&self) -> Option<serde_json::Value> {
        self.requests.lock().last().and_then(|r| r.json().ok())
    }

    /// Number of replies not yet consumed.
    pub fn pending(&self) -> usize {
        self.replies.lock().len()
    }

    fn next_reply(&self, request: HttpRequest) -> ModelResult<(u16, Vec<Result<Bytes, String>>)> {
        self.requests.lock().push(request);
        match self.replies.lock().pop_front() {
            Some(MockReply::Chunks { status, chunks }) => Ok((status, chunks)),
            Some(MockReply::ConnectionError(message)) => Err(ModelError::Connection(message)),
            None => Err(ModelError::Other(anyhow::anyhow!(
                "MockTransport has no queued reply"
            ))),
        }
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> ModelResult<HttpResponse> {
        let (status, chunks) = self.next_reply(request)?;
        let mut body = Vec::new();
        for chunk in chunks {
            body.extend_from_slice(&chunk.map_err(ModelError::Connection)?);
        }
        Ok(HttpResponse {
            status,
            headers: HeaderMap::new(),
            body: Bytes::from(body),
        })
    }

    async fn send_streaming(&self, request: HttpRequest) -> ModelResult<StreamingHttpResponse> {
        let (status, chunks) = self.next_reply(request)?;
        let items: Vec<ModelResult<Bytes>> = chunks
            .into_iter()
            .map(|c| c.map_err(ModelError::Connection))
            .collect();
        Ok(StreamingHttpResponse {
            status,
            headers: HeaderMap::new(),
            body: Box::pin(futures::stream::iter(items)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn request(body: &str) -> HttpRequest {
        HttpRequest::new("http://mock", HeaderMap::new(), body.as_bytes().to_vec())
    }

    #[tokio::test]
    async fn test_replays_in_order_and_records() {
        let transport = MockTransport::new()
            .with_json(200, "first")
            .with_chunks(201, ["sec", "ond"]);

        let first = transport.send(request("{\"n\":1}")).await.unwrap();
        assert_eq!(first.text(), "first");

        let second = transport.send(request("{\"n\":2}")).await.unwrap();
        assert_eq!(second.status, 201);
        assert_eq!(second.text(), "second");

        assert_eq!(transport.requests().len(), 2);
        assert_eq!(transport.last_body().unwrap()["n"], 2);
        assert_eq!(transport.pending(), 0);
    }

    #[tokio::test]
    async fn test_streaming_chunks() {
        let transport = MockTransport::new().with_chunks(200, ["a", "b"]);
        let response = transport.send_streaming(request("{}")).await.unwrap();
        let chunks: Vec<Bytes> = response.body.map(|c| c.unwrap()).collect().await;
        assert_eq!(chunks, vec![Bytes::from("a"), Bytes::from("b")]);
    }

    #[tokio::test]
    async fn test_errors() {
        let transport = MockTransport::new()
            .with_reply(MockReply::ConnectionError("refused".into()))
            .with_reply(MockReply::Chunks {
                status: 200,
                chunks: vec![Ok(Bytes::from("a")), Err("reset".into())],
            });

        let err = transport.send(request("{}")).await.unwrap_err();
        assert!(matches!(err, ModelError::Connection(ref m) if m == "refused"));

        let err = transport.send(request("{}")).await.unwrap_err();
        assert!(matches!(err, ModelError::Connection(ref m) if m == "reset"));

        let err = transport.send(request("{}")).await.unwrap_err();
        assert!(matches!(err, ModelError::Other(_)));
    }
}
