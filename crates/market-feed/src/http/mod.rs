//! HTTP plumbing: the transport seam and the resilient fetch wrapper.

mod fetch;
#[cfg(test)]
pub(crate) mod mock;
mod transport;

pub use fetch::{
    backoff_delay, FetchOptions, ResilientFetcher, DEFAULT_RATE_LIMIT_BACKOFF, DEFAULT_RETRIES,
    DEFAULT_TIMEOUT,
};
pub use transport::{
    parse_retry_after, HttpRequest, HttpResponse, HttpTransport, ReqwestTransport, TransportError,
};
