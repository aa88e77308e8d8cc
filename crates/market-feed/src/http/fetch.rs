//! Timeout, retry and backoff around a single GET.
//!
//! Retry rules:
//! - timeouts, connection failures and 5xx back off `2^attempt` seconds
//! - 429 waits for `Retry-After`, or the caller's fallback delay
//! - any other 4xx fails immediately
//!
//! Every attempt, including a throttled one, counts against `retries`.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::transport::{HttpRequest, HttpResponse, HttpTransport, TransportError};
use crate::clock::Clock;
use crate::errors::{FeedError, RetryClass};

/// Default number of attempts per fetch.
pub const DEFAULT_RETRIES: u32 = 3;

/// Default time budget for a single attempt.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Default wait after a 429 without a `Retry-After` header.
pub const DEFAULT_RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(30);

/// Longest error body kept in a `ClientError` message.
const MAX_ERROR_BODY: usize = 200;

/// Per-call retry and timeout settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchOptions {
    /// Total attempts, including the first one.
    pub retries: u32,
    /// Budget for each attempt.
    pub timeout: Duration,
    /// Wait after a 429 that carried no `Retry-After`.
    pub rate_limit_backoff: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            retries: DEFAULT_RETRIES,
            timeout: DEFAULT_TIMEOUT,
            rate_limit_backoff: DEFAULT_RATE_LIMIT_BACKOFF,
        }
    }
}

impl FetchOptions {
    pub fn with_rate_limit_backoff(mut self, backoff: Duration) -> Self {
        self.rate_limit_backoff = backoff;
        self
    }
}

/// Backoff after the failed attempt with zero-based index `attempt`.
///
/// `2^attempt * 1000` ms: 1s, 2s, 4s, ...
pub fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_millis(2u64.saturating_pow(attempt).saturating_mul(1_000))
}

/// Resilient HTTP GET wrapper.
pub struct ResilientFetcher {
    transport: Arc<dyn HttpTransport>,
    clock: Arc<dyn Clock>,
}

impl ResilientFetcher {
    pub fn new(transport: Arc<dyn HttpTransport>, clock: Arc<dyn Clock>) -> Self {
        Self { transport, clock }
    }

    /// Fetch and deserialize a JSON body.
    pub async fn fetch_json<T: DeserializeOwned>(
        &self,
        provider: &str,
        request: &HttpRequest,
        options: &FetchOptions,
    ) -> Result<T, FeedError> {
        let response = self.fetch(provider, request, options).await?;
        serde_json::from_str(&response.body).map_err(|e| FeedError::decode(provider, e))
    }

    /// Execute the request, retrying transient failures.
    ///
    /// Returns the first 2xx response, the first non-retryable error, or
    /// [`FeedError::RetriesExhausted`] wrapping the last failure.
    pub async fn fetch(
        &self,
        provider: &str,
        request: &HttpRequest,
        options: &FetchOptions,
    ) -> Result<HttpResponse, FeedError> {
        let attempts = options.retries.max(1);
        let mut last_error: Option<FeedError> = None;

        for attempt in 0..attempts {
            let error = match self.attempt(provider, request, options.timeout).await {
                Ok(response) => {
                    if attempt > 0 {
                        debug!(
                            provider,
                            attempt = attempt + 1,
                            "Request to {} succeeded after retry",
                            request.display_url()
                        );
                    }
                    return Ok(response);
                }
                Err(error) => error,
            };

            let wait = match error.retry_class() {
                RetryClass::Never => return Err(error),
                RetryClass::WithBackoff => backoff_delay(attempt),
                RetryClass::AfterServerDelay(server_delay) => {
                    server_delay.unwrap_or(options.rate_limit_backoff)
                }
            };

            if attempt + 1 < attempts {
                warn!(
                    provider,
                    attempt = attempt + 1,
                    max_attempts = attempts,
                    wait_ms = wait.as_millis() as u64,
                    "{} ({}), retrying in {:?}",
                    error,
                    request.display_url(),
                    wait
                );
                self.clock.sleep(wait).await;
            }
            last_error = Some(error);
        }

        let last = last_error.unwrap_or(FeedError::Timeout {
            provider: provider.to_string(),
        });
        warn!(provider, attempts, "Giving up on {}: {}", request.display_url(), last);

        Err(FeedError::RetriesExhausted {
            provider: provider.to_string(),
            attempts,
            last: Box::new(last),
        })
    }

    /// One bounded attempt. Dropping the transport future on timeout cancels it.
    async fn attempt(
        &self,
        provider: &str,
        request: &HttpRequest,
        timeout: Duration,
    ) -> Result<HttpResponse, FeedError> {
        let response = match tokio::time::timeout(timeout, self.transport.get(request)).await {
            Err(_) | Ok(Err(TransportError::Timeout)) => {
                return Err(FeedError::Timeout {
                    provider: provider.to_string(),
                })
            }
            Ok(Err(TransportError::Connection(message))) => {
                return Err(FeedError::Network {
                    provider: provider.to_string(),
                    message,
                })
            }
            Ok(Ok(response)) => response,
        };

        classify_status(provider, response)
    }
}

/// Map a response status onto success or the matching error.
fn classify_status(provider: &str, response: HttpResponse) -> Result<HttpResponse, FeedError> {
    match response.status {
        200..=299 => Ok(response),
        429 => Err(FeedError::RateLimited {
            provider: provider.to_string(),
            retry_after: response.retry_after,
        }),
        500..=599 => Err(FeedError::ServerError {
            provider: provider.to_string(),
            status: response.status,
        }),
        status => {
            let mut message = response.body;
            if message.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !message.is_char_boundary(cut) {
                    cut -= 1;
                }
                message.truncate(cut);
            }
            Err(FeedError::ClientError {
                provider: provider.to_string(),
                status,
                message,
            })
        }
    }
}
