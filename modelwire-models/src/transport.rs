//! HTTP transport abstraction.
//!
//! Adapters never touch `reqwest` directly. They build an [`HttpRequest`] and
//! hand it to an [`HttpTransport`], which lets tests substitute
//! [`MockTransport`](crate::mock::MockTransport) and lets callers share one
//! connection pool across many models.

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt, TryStreamExt};
use reqwest::header::HeaderMap;
use std::collections::HashMap;
use std::pin::Pin;
use std::time::Duration;

use crate::error::{ModelError, ModelResult};

/// Ordered stream of body chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = ModelResult<Bytes>> + Send>>;

/// A JSON POST request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// Target URL.
    pub url: String,
    /// Request headers.
    pub headers: HeaderMap,
    /// Serialized JSON body.
    pub body: Vec<u8>,
    /// Per-request deadline.
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    /// Create a request with the given URL, headers and body.
    pub fn new(url: impl Into<String>, headers: HeaderMap, body: Vec<u8>) -> Self {
        Self {
            url: url.into(),
            headers,
            body,
            timeout: None,
        }
    }

    /// Set the per-request deadline.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Parse the body as JSON.
    pub fn json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// A fully buffered response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response body.
    pub body: Bytes,
}

impl HttpResponse {
    /// Whether the status is 2xx.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The body as text, lossily decoded.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// A response whose body arrives incrementally.
pub struct StreamingHttpResponse {
    /// Status code.
    pub status: u16,
    /// Response headers.
    pub headers: HeaderMap,
    /// Body chunks in arrival order.
    pub body: ByteStream,
}

impl StreamingHttpResponse {
    /// Whether the status is 2xx.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Read the remaining body to the end.
    pub async fn drain(self) -> ModelResult<String> {
        let chunks: Vec<Bytes> = self.body.try_collect().await?;
        let bytes: Vec<u8> = chunks.concat();
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

impl std::fmt::Debug for StreamingHttpResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingHttpResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Transport used by the model adapters.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send a request and buffer the whole response.
    async fn send(&self, request: HttpRequest) -> ModelResult<HttpResponse>;

    /// Send a request and return as soon as the status and headers arrive.
    async fn send_streaming(&self, request: HttpRequest) -> ModelResult<StreamingHttpResponse>;
}

/// Flatten a header map for error reporting.
pub(crate) fn header_map_to_hash(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
        .collect()
}

/// Transport backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a transport with a default client.
    pub fn new() -> ModelResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;
        Ok(Self { client })
    }

    /// Create a transport around an existing client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn build(&self, request: HttpRequest) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .post(&request.url)
            .headers(request.headers)
            .body(request.body);
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }
        builder
    }
}

fn map_send_error(err: reqwest::Error, timeout: Option<Duration>) -> ModelError {
    match (err.is_timeout(), timeout) {
        (true, Some(timeout)) => ModelError::Timeout(timeout),
        _ => err.into(),
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> ModelResult<HttpResponse> {
        let timeout = request.timeout;
        let response = self
            .build(request)
            .send()
            .await
            .map_err(|e| map_send_error(e, timeout))?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| map_send_error(e, timeout))?;
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    async fn send_streaming(&self, request: HttpRequest) -> ModelResult<StreamingHttpResponse> {
        let timeout = request.timeout;
        let response = self
            .build(request)
            .send()
            .await
            .map_err(|e| map_send_error(e, timeout))?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response
            .bytes_stream()
            .map(move |chunk| chunk.map_err(|e| map_send_error(e, timeout)));
        Ok(StreamingHttpResponse {
            status,
            headers,
            body: Box::pin(body),
        })
    }
}
