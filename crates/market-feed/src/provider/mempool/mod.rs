//! mempool.space provider for fee tiers and mempool backlog.

use serde::de::IgnoredAny;
use serde::Deserialize;
use tracing::warn;

use super::upstream::Upstream;
use crate::errors::FeedError;
use crate::models::defaults::MEMPOOL_DEFAULTS;
use crate::models::MempoolStats;

const SATOSHIS_PER_BTC: f64 = 100_000_000.0;

/// Response from /v1/fees/recommended (sat/vB)
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecommendedFees {
    fastest_fee: Option<f64>,
    half_hour_fee: Option<f64>,
    hour_fee: Option<f64>,
    economy_fee: Option<f64>,
    minimum_fee: Option<f64>,
}

/// Response from /mempool
#[derive(Debug, Deserialize)]
struct MempoolSummary {
    count: Option<u64>,
    vsize: Option<u64>,
    /// Satoshis
    total_fee: Option<f64>,
}

pub struct MempoolProvider {
    upstream: Upstream,
}

impl MempoolProvider {
    pub fn new(upstream: Upstream) -> Self {
        Self { upstream }
    }

    /// Fee tiers are required; the backlog summary and projected blocks
    /// fall back to defaults when their endpoints fail.
    pub async fn mempool_stats(&self) -> Result<MempoolStats, FeedError> {
        let fees: RecommendedFees = self
            .upstream
            .get_json(self.upstream.request("/v1/fees/recommended"))
            .await?;

        let summary: Option<MempoolSummary> = match self
            .upstream
            .get_json(self.upstream.request("/mempool"))
            .await
        {
            Ok(summary) => Some(summary),
            Err(e) => {
                warn!(provider = self.upstream.id(), "Mempool summary unavailable: {}", e);
                None
            }
        };

        let blocks: Option<Vec<IgnoredAny>> = match self
            .upstream
            .get_json(self.upstream.request("/v1/fees/mempool-blocks"))
            .await
        {
            Ok(blocks) => Some(blocks),
            Err(e) => {
                warn!(provider = self.upstream.id(), "Projected blocks unavailable: {}", e);
                None
            }
        };

        Ok(map_mempool(fees, summary, blocks))
    }
}

fn map_mempool(
    fees: RecommendedFees,
    summary: Option<MempoolSummary>,
    blocks: Option<Vec<IgnoredAny>>,
) -> MempoolStats {
    let d = MEMPOOL_DEFAULTS;
    let (tx_count, vsize_bytes, total_fee_btc) = match summary {
        Some(s) => (
            s.count.unwrap_or(d.tx_count),
            s.vsize.unwrap_or(d.vsize_bytes),
            s.total_fee
                .map(|sats| sats / SATOSHIS_PER_BTC)
                .unwrap_or(d.total_fee_btc),
        ),
        None => (d.tx_count, d.vsize_bytes, d.total_fee_btc),
    };

    MempoolStats {
        fastest_fee: fees.fastest_fee.unwrap_or(d.fastest_fee),
        half_hour_fee: fees.half_hour_fee.unwrap_or(d.half_hour_fee),
        hour_fee: fees.hour_fee.unwrap_or(d.hour_fee),
        economy_fee: fees.economy_fee.unwrap_or(d.economy_fee),
        minimum_fee: fees.minimum_fee.unwrap_or(d.minimum_fee),
        tx_count,
        vsize_bytes,
        total_fee_btc,
        pending_blocks: blocks
            .map(|b| b.len() as u32)
            .unwrap_or(d.pending_blocks),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpResponse, TransportError};
    use crate::provider::upstream::testing::upstream;
    use crate::provider::upstream::ApiKeyPlacement;

    const FEES: &str =
        r#"{"fastestFee": 24, "halfHourFee": 18, "hourFee": 12, "economyFee": 6, "minimumFee": 3}"#;

    #[tokio::test]
    async fn test_mempool_stats() {
        let (up, transport) = upstream("MEMPOOL", None, ApiKeyPlacement::NotRequired);
        transport
            .on_json("/v1/fees/recommended", FEES)
            .on_json(
                "/mempool",
                r#"{"count": 42000, "vsize": 31000000, "total_fee": 25000000, "fee_histogram": []}"#,
            )
            .on_json(
                "/v1/fees/mempool-blocks",
                r#"[{"nTx": 3000}, {"nTx": 2900}, {"nTx": 8000}]"#,
            );

        let stats = MempoolProvider::new(up).mempool_stats().await.unwrap();

        assert_eq!(stats.fastest_fee, 24.0);
        assert_eq!(stats.half_hour_fee, 18.0);
        assert_eq!(stats.economy_fee, 6.0);
        assert_eq!(stats.tx_count, 42_000);
        assert_eq!(stats.vsize_bytes, 31_000_000);
        assert_eq!(stats.total_fee_btc, 0.25);
        assert_eq!(stats.pending_blocks, 3);
    }

    #[tokio::test]
    async fn test_secondary_endpoints_fall_back() {
        let (up, transport) = upstream("MEMPOOL", None, ApiKeyPlacement::NotRequired);
        transport
            .on_json("/v1/fees/recommended", FEES)
            .on("/mempool", Ok(HttpResponse::status(404)))
            .on(
                "/v1/fees/mempool-blocks",
                Err(TransportError::Connection("reset".to_string())),
            );

        let stats = MempoolProvider::new(up).mempool_stats().await.unwrap();

        assert_eq!(stats.hour_fee, 12.0);
        assert_eq!(stats.tx_count, MEMPOOL_DEFAULTS.tx_count);
        assert_eq!(stats.pending_blocks, MEMPOOL_DEFAULTS.pending_blocks);
    }

    #[tokio::test]
    async fn test_fee_failure_raises() {
        let (up, transport) = upstream("MEMPOOL", None, ApiKeyPlacement::NotRequired);
        transport.on("/v1/fees/recommended", Ok(HttpResponse::status(503)));

        let result = MempoolProvider::new(up).mempool_stats().await;
        assert!(result.is_err());
    }
}
