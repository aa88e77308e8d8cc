//! alternative.me provider for the crypto fear & greed index.

use serde::Deserialize;

use super::upstream::Upstream;
use crate::errors::FeedError;
use crate::models::defaults::FEAR_GREED_UNCLASSIFIED;
use crate::models::FearGreed;

/// Response from /fng/
#[derive(Debug, Deserialize)]
struct FngResponse {
    #[serde(default)]
    data: Vec<FngEntry>,
}

/// The index value arrives as a string, e.g. `"54"`.
#[derive(Debug, Deserialize)]
struct FngEntry {
    value: Option<String>,
    value_classification: Option<String>,
}

pub struct AlternativeMeProvider {
    upstream: Upstream,
}

impl AlternativeMeProvider {
    pub fn new(upstream: Upstream) -> Self {
        Self { upstream }
    }

    pub async fn fear_greed(&self) -> Result<FearGreed, FeedError> {
        let request = self.upstream.request("/fng/").query("limit", "1");
        let response: FngResponse = self.upstream.get_json(request).await?;
        map_fear_greed(response, self.upstream.id())
    }
}

fn map_fear_greed(response: FngResponse, provider: &str) -> Result<FearGreed, FeedError> {
    let entry = response
        .data
        .into_iter()
        .next()
        .ok_or_else(|| FeedError::missing_field(provider, "data[0]"))?;

    let value = entry
        .value
        .as_deref()
        .and_then(|v| v.trim().parse::<f64>().ok())
        .ok_or_else(|| FeedError::missing_field(provider, "data[0].value"))?;

    Ok(FearGreed {
        value: value.round().clamp(0.0, 100.0) as u8,
        classification: entry
            .value_classification
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| FEAR_GREED_UNCLASSIFIED.to_string()),
    })
}
