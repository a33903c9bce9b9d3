//! Token cost accounting for model requests.
//!
//! A [`Cost`] is produced for every response (and for every streamed chunk
//! that carries usage). Costs add field by field; a missing count behaves
//! like zero, so `Cost::default()` is the identity for `+`.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign};

/// Token usage and provider-specific usage details for one or more requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cost {
    /// Number of tokens in the request/prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_tokens: Option<u64>,
    /// Number of tokens in the response/completion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_tokens: Option<u64>,
    /// Total tokens as reported by the provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,
    /// Flattened provider-specific counters (cached tokens, reasoning tokens, ...).
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub details: IndexMap<String, u64>,
}

impl Cost {
    /// Create a new empty cost record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cost with request, response and total tokens.
    #[must_use]
    pub fn with_tokens(request_tokens: u64, response_tokens: u64, total_tokens: u64) -> Self {
        Self {
            request_tokens: Some(request_tokens),
            response_tokens: Some(response_tokens),
            total_tokens: Some(total_tokens),
            details: IndexMap::new(),
        }
    }

    /// Add a detail counter.
    #[must_use]
    pub fn with_detail(mut self, key: impl Into<String>, value: u64) -> Self {
        self.details.insert(key.into(), value);
        self
    }

    /// Merge another cost record into this one.
    pub fn merge(&mut self, other: &Cost) {
        self.request_tokens = add_optional(self.request_tokens, other.request_tokens);
        self.response_tokens = add_optional(self.response_tokens, other.response_tokens);
        self.total_tokens = add_optional(self.total_tokens, other.total_tokens);
        for (key, value) in &other.details {
            *self.details.entry(key.clone()).or_insert(0) += value;
        }
    }

    /// Get total tokens, calculating from the parts if the provider did not report it.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.total_tokens
            .unwrap_or_else(|| self.request_tokens.unwrap_or(0) + self.response_tokens.unwrap_or(0))
    }

    /// Check if this record carries any data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.request_tokens.is_none()
            && self.response_tokens.is_none()
            && self.total_tokens.is_none()
            && self.details.is_empty()
    }
}

fn add_optional(a: Option<u64>, b: Option<u64>) -> Option<u64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a + b),
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    }
}

impl Add for Cost {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self::Output {
        self.merge(&rhs);
        self
    }
}

impl AddAssign for Cost {
    fn add_assign(&mut self, rhs: Self) {
        self.merge(&rhs);
    }
}

impl std::iter::Sum for Cost {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Cost::default(), Add::add)
    }
}
