//! Error types and retry classification for the market feed crate.
//!
//! This module provides:
//! - [`FeedError`]: The main error enum for all fetch and refresh operations
//! - [`RetryClass`]: Classification for determining retry behavior

mod retry;

pub use retry::RetryClass;

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while fetching or normalizing upstream data.
///
/// Each variant is classified into a [`RetryClass`] via the
/// [`retry_class`](Self::retry_class) method, which determines how the
/// resilient fetcher handles the failure.
#[derive(Error, Debug, Clone)]
pub enum FeedError {
    /// The provider rate limited the request (HTTP 429).
    #[error("Rate limited: {provider}")]
    RateLimited {
        /// The provider that rate limited the request
        provider: String,
        /// Server-supplied `Retry-After`, when present
        retry_after: Option<Duration>,
    },

    /// A single attempt exceeded its time budget.
    #[error("Timeout: {provider}")]
    Timeout {
        /// The provider that timed out
        provider: String,
    },

    /// The provider answered with a 5xx status.
    #[error("Server error from {provider}: HTTP {status}")]
    ServerError { provider: String, status: u16 },

    /// The provider rejected the request (4xx other than 429).
    /// Indicates a configuration or request-shape bug.
    #[error("Client error from {provider}: HTTP {status} - {message}")]
    ClientError {
        provider: String,
        status: u16,
        message: String,
    },

    /// The connection failed before a response arrived.
    #[error("Network error from {provider}: {message}")]
    Network { provider: String, message: String },

    /// The response body did not match the expected schema.
    #[error("Failed to decode {provider} response: {message}")]
    Decode { provider: String, message: String },

    /// A mandatory field was absent from an otherwise valid response.
    #[error("Missing field '{field}' in {provider} response")]
    MissingField { provider: String, field: String },

    /// The provider requires an API key and none is configured.
    #[error("No API key configured for {provider}")]
    MissingApiKey { provider: String },

    /// Every attempt failed; wraps the last failure.
    #[error("{provider} failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        provider: String,
        attempts: u32,
        last: Box<FeedError>,
    },

    /// A dataset key that this service does not know about.
    #[error("Unknown dataset: {0}")]
    UnknownDataset(String),
}

impl FeedError {
    /// Returns the retry classification for this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use pulse_market_feed::errors::{FeedError, RetryClass};
    ///
    /// let error = FeedError::ServerError { provider: "COINGECKO".to_string(), status: 503 };
    /// assert_eq!(error.retry_class(), RetryClass::WithBackoff);
    ///
    /// let error = FeedError::ClientError {
    ///     provider: "COINGECKO".to_string(),
    ///     status: 404,
    ///     message: "not found".to_string(),
    /// };
    /// assert_eq!(error.retry_class(), RetryClass::Never);
    /// ```
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Self::RateLimited { retry_after, .. } => RetryClass::AfterServerDelay(*retry_after),

            Self::Timeout { .. } | Self::ServerError { .. } | Self::Network { .. } => {
                RetryClass::WithBackoff
            }

            Self::ClientError { .. }
            | Self::Decode { .. }
            | Self::MissingField { .. }
            | Self::MissingApiKey { .. }
            | Self::RetriesExhausted { .. }
            | Self::UnknownDataset(_) => RetryClass::Never,
        }
    }

    /// HTTP status carried by this error, if any. Unwraps exhausted retries.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RateLimited { .. } => Some(429),
            Self::ServerError { status, .. } | Self::ClientError { status, .. } => Some(*status),
            Self::RetriesExhausted { last, .. } => last.status(),
            _ => None,
        }
    }

    pub(crate) fn decode(provider: &str, message: impl ToString) -> Self {
        Self::Decode {
            provider: provider.to_string(),
            message: message.to_string(),
        }
    }

    pub(crate) fn missing_field(provider: &str, field: &str) -> Self {
        Self::MissingField {
            provider: provider.to_string(),
            field: field.to_string(),
        }
    }
}
