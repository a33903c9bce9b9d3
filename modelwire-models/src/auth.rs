//! Credential header providers.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};

use crate::error::{ModelError, ModelResult};

/// Produces the authentication headers for a request.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HeaderProvider: Send + Sync {
    /// Headers to add to every request.
    async fn headers(&self) -> ModelResult<HeaderMap>;
}

fn header_value(value: &str) -> ModelResult<HeaderValue> {
    let mut value = HeaderValue::from_str(value)
        .map_err(|e| ModelError::configuration(format!("Invalid API key: {}", e)))?;
    value.set_sensitive(true);
    Ok(value)
}

/// `Authorization: Bearer <key>`.
#[derive(Clone)]
pub struct BearerAuth {
    api_key: String,
}

impl BearerAuth {
    /// Create a bearer-token provider.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }
}

impl std::fmt::Debug for BearerAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerAuth").field("api_key", &"***").finish()
    }
}

#[async_trait]
impl HeaderProvider for BearerAuth {
    async fn headers(&self) -> ModelResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            header_value(&format!("Bearer {}", self.api_key))?,
        );
        Ok(headers)
    }
}

/// An API key sent in a named header, e.g. `X-Goog-Api-Key`.
#[derive(Clone)]
pub struct ApiKeyAuth {
    header: HeaderName,
    api_key: String,
}

impl ApiKeyAuth {
    /// Header used by the Gemini API.
    pub const GOOGLE_HEADER: &'static str = "x-goog-api-key";

    /// Create a provider sending `api_key` in `header`.
    pub fn new(header: HeaderName, api_key: impl Into<String>) -> Self {
        Self {
            header,
            api_key: api_key.into(),
        }
    }

    /// Create a provider for the Gemini API.
    pub fn google(api_key: impl Into<String>) -> Self {
        Self::new(HeaderName::from_static(Self::GOOGLE_HEADER), api_key)
    }
}

impl std::fmt::Debug for ApiKeyAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeyAuth")
            .field("header", &self.header)
            .field("api_key", &"***")
            .finish()
    }
}

#[async_trait]
impl HeaderProvider for ApiKeyAuth {
    async fn headers(&self) -> ModelResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(self.header.clone(), header_value(&self.api_key)?);
        Ok(headers)
    }
}
