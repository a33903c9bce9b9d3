//! Provider configuration.
//!
//! Explicit settings win over environment variables; the environment is only
//! consulted for values the caller left unset.

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, USER_AGENT};
use std::time::Duration;

use crate::error::{ModelError, ModelResult};

/// `User-Agent` sent with every request.
pub const DEFAULT_USER_AGENT: &str = concat!("modelwire/", env!("CARGO_PKG_VERSION"));

/// Common configuration for providers.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ProviderConfig {
    /// API key for authentication.
    pub api_key: Option<String>,
    /// Custom base URL.
    pub base_url: Option<String>,
    /// Default request timeout, used when settings carry none.
    pub timeout: Option<Duration>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ProviderConfig {
    /// Create a new empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set API key.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set base URL.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Load from environment variables with given prefix.
    ///
    /// Looks for:
    /// - `{PREFIX}_API_KEY`
    /// - `{PREFIX}_BASE_URL`
    pub fn from_env(prefix: &str) -> Self {
        Self::from_lookup(prefix, |name| std::env::var(name).ok())
    }

    /// Load using an arbitrary variable lookup.
    pub fn from_lookup(prefix: &str, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name: String| lookup(&name).filter(|v| !v.is_empty());
        Self {
            api_key: non_empty(format!("{}_API_KEY", prefix)),
            base_url: non_empty(format!("{}_BASE_URL", prefix)),
            timeout: None,
        }
    }

    /// Fill unset fields from `fallback`.
    #[must_use]
    pub fn merge(self, fallback: ProviderConfig) -> Self {
        Self {
            api_key: self.api_key.or(fallback.api_key),
            base_url: self.base_url.or(fallback.base_url),
            timeout: self.timeout.or(fallback.timeout),
        }
    }

    /// The API key, or a configuration error naming the variable to set.
    pub fn require_api_key(&self, env_prefix: &str) -> ModelResult<&str> {
        match self.api_key.as_deref() {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err(ModelError::configuration(format!(
                "API key must be provided or set in the {}_API_KEY environment variable",
                env_prefix
            ))),
        }
    }
}

/// Headers shared by every JSON request.
pub(crate) fn json_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
    headers
}

/// Reject an endpoint that is not an absolute URL.
pub(crate) fn require_valid_url(endpoint: &str) -> ModelResult<()> {
    url::Url::parse(endpoint)
        .map(|_| ())
        .map_err(|e| ModelError::configuration(format!("Invalid endpoint `{}`: {}", endpoint, e)))
}

/// Reject an empty model name.
pub(crate) fn require_model_name(name: &str) -> ModelResult<()> {
    if name.trim().is_empty() {
        return Err(ModelError::configuration("Model name must not be empty"));
    }
    Ok(())
}
