use std::time::Duration;

/// Classification for retry policy.
///
/// Used by the resilient fetcher to decide whether a failed attempt is
/// worth repeating and how long to wait before doing so.
///
/// # Behavior Summary
///
/// | Class | Retry? | Wait before next attempt |
/// |-------|--------|--------------------------|
/// | `Never` | No | - |
/// | `WithBackoff` | Yes | `2^attempt` seconds |
/// | `AfterServerDelay` | Yes | `Retry-After` or the caller's fallback |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryClass {
    /// Never retry - client error, bad payload, or missing configuration.
    /// The request is fundamentally invalid and retrying won't help.
    Never,

    /// Transient failure (timeout, 5xx, dropped connection).
    /// Retry after an exponential backoff.
    WithBackoff,

    /// The upstream throttled us (HTTP 429).
    ///
    /// Retry once the server-supplied delay has elapsed. When the server did
    /// not send one, the fetcher falls back to the caller's configured delay.
    AfterServerDelay(Option<Duration>),
}

impl RetryClass {
    /// Whether another attempt may be issued for this class.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Never)
    }
}
