//! Shared request path for every provider: admission, URL building, fetch.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::ProviderConfig;
use crate::errors::FeedError;
use crate::http::{FetchOptions, HttpRequest, ResilientFetcher};
use crate::rate_limiter::RateLimiter;

/// How a provider expects its API key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApiKeyPlacement {
    Header(&'static str),
    Query(&'static str),
    /// Public endpoint; a configured key is ignored.
    NotRequired,
}

/// One upstream provider bound to the shared fetcher and rate limiter.
#[derive(Clone)]
pub struct Upstream {
    id: &'static str,
    config: ProviderConfig,
    key_placement: ApiKeyPlacement,
    fetcher: Arc<ResilientFetcher>,
    limiter: Arc<RateLimiter>,
    options: FetchOptions,
}

impl Upstream {
    /// Bind a provider and register its per-minute limit with the limiter.
    pub fn new(
        id: &'static str,
        config: ProviderConfig,
        key_placement: ApiKeyPlacement,
        fetcher: Arc<ResilientFetcher>,
        limiter: Arc<RateLimiter>,
        options: FetchOptions,
    ) -> Self {
        limiter.configure(id, config.rate_limit_per_minute);
        Self {
            id,
            config,
            key_placement,
            fetcher,
            limiter,
            options,
        }
    }

    pub fn id(&self) -> &'static str {
        self.id
    }

    pub fn has_api_key(&self) -> bool {
        self.config.api_key.is_some()
    }

    /// Fail fast for providers that cannot be called without a key.
    pub fn require_api_key(&self) -> Result<(), FeedError> {
        if self.has_api_key() {
            Ok(())
        } else {
            Err(FeedError::MissingApiKey {
                provider: self.id.to_string(),
            })
        }
    }

    /// Request for `path` under the base URL, with the API key attached.
    pub fn request(&self, path: &str) -> HttpRequest {
        let request = HttpRequest::get(format!("{}{}", self.config.base_url, path));
        match (&self.config.api_key, self.key_placement) {
            (Some(key), ApiKeyPlacement::Header(name)) => request.header(name, key.as_str()),
            (Some(key), ApiKeyPlacement::Query(name)) => request.query(name, key.as_str()),
            (Some(_), ApiKeyPlacement::NotRequired) | (None, _) => request,
        }
    }

    /// Wait for admission, then fetch and decode.
    pub async fn get_json<T: DeserializeOwned>(&self, request: HttpRequest) -> Result<T, FeedError> {
        self.limiter.wait_for_rate_limit(self.id).await;
        debug!(provider = self.id, "GET {}", request.display_url());
        self.fetcher
            .fetch_json(self.id, &request, &self.options)
            .await
    }
}
