//! Minimal GET transport abstraction over `reqwest`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

/// User agent sent with every upstream request.
const USER_AGENT: &str = concat!("pulse-market-feed/", env!("CARGO_PKG_VERSION"));

/// An outbound GET request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_string(), value.into()));
        self
    }

    pub fn header(mut self, key: &str, value: impl Into<String>) -> Self {
        self.headers.push((key.to_string(), value.into()));
        self
    }

    /// Query parameter value by name.
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// URL with the encoded query string, with secrets left out.
    pub fn display_url(&self) -> String {
        let visible: Vec<String> = self
            .query
            .iter()
            .filter(|(k, _)| !k.contains("key"))
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect();
        if visible.is_empty() {
            self.url.clone()
        } else {
            format!("{}?{}", self.url, visible.join("&"))
        }
    }
}

/// The parts of a response the fetcher cares about.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub retry_after: Option<Duration>,
    pub body: String,
}

impl HttpResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            retry_after: None,
            body: body.into(),
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            retry_after: None,
            body: String::new(),
        }
    }

    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = Some(retry_after);
        self
    }
}

/// Failure before any HTTP status was received.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportError {
    Timeout,
    Connection(String),
}

/// Executes GET requests. Implementations must be cancel-safe: the fetcher
/// drops the future when an attempt exceeds its timeout.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Parse a `Retry-After` header given in seconds.
///
/// HTTP-date values are not supported and yield `None`.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

/// Production transport backed by a shared `reqwest::Client`.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self.client.get(&request.url).query(&request.query);
        for (key, value) in &request.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout
            } else {
                TransportError::Connection(e.to_string())
            }
        })?;

        let status = response.status().as_u16();

        // Parse retry-after header BEFORE consuming body
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after);

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout
            } else {
                TransportError::Connection(format!("Failed to read response: {}", e))
            }
        })?;

        Ok(HttpResponse {
            status,
            retry_after,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_retry_after_seconds() {
        assert_eq!(parse_retry_after("5"), Some(Duration::from_secs(5)));
        assert_eq!(parse_retry_after(" 120 "), Some(Duration::from_secs(120)));
        assert_eq!(parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"), None);
        assert_eq!(parse_retry_after(""), None);
    }

    #[test]
    fn test_display_url_hides_keys() {
        let request = HttpRequest::get("https://api.stlouisfed.org/fred/series/observations")
            .query("series_id", "DGS10")
            .query("api_key", "secret")
            .query("file_type", "json");

        assert_eq!(
            request.display_url(),
            "https://api.stlouisfed.org/fred/series/observations?series_id=DGS10&file_type=json"
        );
        assert_eq!(request.query_value("api_key"), Some("secret"));
    }

    #[test]
    fn test_display_url_encodes_values() {
        let request = HttpRequest::get("https://api.coingecko.com/api/v3/simple/price")
            .query("ids", "ethereum,solana");
        assert_eq!(
            request.display_url(),
            "https://api.coingecko.com/api/v3/simple/price?ids=ethereum%2Csolana"
        );
    }
}
