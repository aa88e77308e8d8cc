//! OpenSea provider for NFT collection statistics. Requires an API key.

use serde::Deserialize;
use tracing::warn;
use urlencoding::encode;

use super::upstream::Upstream;
use crate::errors::FeedError;
use crate::models::defaults::{NFT_COUNT_DEFAULT, NFT_FLOOR_SYMBOL_DEFAULT, NFT_NUMERIC_DEFAULT};
use crate::models::NftCollectionStats;

const ONE_DAY_INTERVAL: &str = "one_day";

/// Response from /collections/{slug}/stats
#[derive(Debug, Deserialize)]
struct CollectionStatsResponse {
    total: Option<TotalStats>,
    #[serde(default)]
    intervals: Vec<IntervalStats>,
}

#[derive(Debug, Default, Deserialize)]
struct TotalStats {
    volume: Option<f64>,
    num_owners: Option<u64>,
    floor_price: Option<f64>,
    floor_price_symbol: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IntervalStats {
    interval: String,
    volume: Option<f64>,
    /// Fractional change, e.g. 0.12 for +12%
    volume_change: Option<f64>,
    sales: Option<f64>,
    average_price: Option<f64>,
}

pub struct OpenSeaProvider {
    upstream: Upstream,
}

impl OpenSeaProvider {
    pub fn new(upstream: Upstream) -> Self {
        Self { upstream }
    }

    pub async fn collection_stats(&self, slug: &str) -> Result<NftCollectionStats, FeedError> {
        self.upstream.require_api_key()?;
        let request = self
            .upstream
            .request(&format!("/collections/{}/stats", encode(slug)));
        let response: CollectionStatsResponse = self.upstream.get_json(request).await?;
        map_collection_stats(slug, response, self.upstream.id())
    }

    /// Stats for every slug, in input order.
    ///
    /// A failing collection is skipped; the call only fails when none succeed
    /// or no API key is configured.
    pub async fn curated_nfts(&self, slugs: &[String]) -> Result<Vec<NftCollectionStats>, FeedError> {
        self.upstream.require_api_key()?;

        let mut collections = Vec::with_capacity(slugs.len());
        let mut last_error = None;
        for slug in slugs {
            match self.collection_stats(slug).await {
                Ok(stats) => collections.push(stats),
                Err(e) => {
                    warn!(provider = self.upstream.id(), "Skipping collection {}: {}", slug, e);
                    last_error = Some(e);
                }
            }
        }

        match (collections.is_empty(), last_error) {
            (true, Some(e)) => Err(e),
            _ => Ok(collections),
        }
    }
}

fn map_collection_stats(
    slug: &str,
    response: CollectionStatsResponse,
    provider: &str,
) -> Result<NftCollectionStats, FeedError> {
    let total = response
        .total
        .ok_or_else(|| FeedError::missing_field(provider, "total"))?;
    let one_day = response
        .intervals
        .into_iter()
        .find(|i| i.interval == ONE_DAY_INTERVAL);

    let (volume_24h, volume_change_24h_pct, sales_24h, average_price_24h) = match one_day {
        Some(day) => (
            day.volume.unwrap_or(NFT_NUMERIC_DEFAULT),
            day.volume_change.map(|c| c * 100.0).unwrap_or(NFT_NUMERIC_DEFAULT),
            day.sales.map(|s| s.max(0.0) as u64).unwrap_or(NFT_COUNT_DEFAULT),
            day.average_price.unwrap_or(NFT_NUMERIC_DEFAULT),
        ),
        None => (
            NFT_NUMERIC_DEFAULT,
            NFT_NUMERIC_DEFAULT,
            NFT_COUNT_DEFAULT,
            NFT_NUMERIC_DEFAULT,
        ),
    };

    Ok(NftCollectionStats {
        slug: slug.to_string(),
        floor_price: total.floor_price.unwrap_or(NFT_NUMERIC_DEFAULT),
        floor_price_symbol: total
            .floor_price_symbol
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| NFT_FLOOR_SYMBOL_DEFAULT.to_string()),
        volume_24h,
        volume_change_24h_pct,
        sales_24h,
        average_price_24h,
        owners: total.num_owners.unwrap_or(NFT_COUNT_DEFAULT),
        total_volume: total.volume.unwrap_or(NFT_NUMERIC_DEFAULT),
    })
}
