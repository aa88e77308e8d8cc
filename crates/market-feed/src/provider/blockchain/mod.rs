//! Blockchain.info provider for network-level statistics.

use serde::Deserialize;

use super::upstream::Upstream;
use crate::errors::FeedError;
use crate::models::defaults::NETWORK_DEFAULTS;
use crate::models::NetworkStats;

const SATOSHIS_PER_BTC: f64 = 100_000_000.0;

/// Upstream reports GH/s.
const GHS_PER_EHS: f64 = 1_000_000_000.0;

/// Response from /stats
#[derive(Debug, Deserialize)]
struct StatsResponse {
    /// GH/s
    hash_rate: Option<f64>,
    difficulty: Option<f64>,
    n_blocks_total: Option<u64>,
    minutes_between_blocks: Option<f64>,
    /// Total bytes of blocks mined in the last 24h
    blocks_size: Option<f64>,
    /// Blocks mined in the last 24h
    n_blocks_mined: Option<u64>,
    /// Total supply in satoshis
    totalbc: Option<f64>,
    // Note: market_price_usd exists but price comes from the market provider
}

pub struct BlockchainProvider {
    upstream: Upstream,
}

impl BlockchainProvider {
    pub fn new(upstream: Upstream) -> Self {
        Self { upstream }
    }

    pub async fn network_stats(&self) -> Result<NetworkStats, FeedError> {
        let request = self.upstream.request("/stats");
        let response: StatsResponse = self.upstream.get_json(request).await?;
        Ok(map_stats(response))
    }
}

fn map_stats(response: StatsResponse) -> NetworkStats {
    let avg_block_size_bytes = match (response.blocks_size, response.n_blocks_mined) {
        (Some(size), Some(blocks)) if blocks > 0 => size / blocks as f64,
        _ => NETWORK_DEFAULTS.avg_block_size_bytes,
    };

    NetworkStats {
        hash_rate_ehs: response
            .hash_rate
            .map(|ghs| ghs / GHS_PER_EHS)
            .unwrap_or(NETWORK_DEFAULTS.hash_rate_ehs),
        difficulty: response.difficulty.unwrap_or(NETWORK_DEFAULTS.difficulty),
        block_height: response
            .n_blocks_total
            .unwrap_or(NETWORK_DEFAULTS.block_height),
        avg_block_time_minutes: response
            .minutes_between_blocks
            .filter(|m| *m > 0.0)
            .unwrap_or(NETWORK_DEFAULTS.avg_block_time_minutes),
        avg_block_size_bytes,
        total_btc_mined: response
            .totalbc
            .map(|sats| sats / SATOSHIS_PER_BTC)
            .unwrap_or(NETWORK_DEFAULTS.total_btc_mined),
    }
}
