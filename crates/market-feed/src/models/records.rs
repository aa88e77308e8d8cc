//! Provider-agnostic records stored in the dataset cache.

use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::defaults::{DEFAULT_BLOCK_TIME_MINUTES, HALVING_INTERVAL};

/// Bitcoin spot market snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BitcoinMarket {
    /// Spot price in USD (mandatory upstream field).
    pub price: Decimal,
    pub change_24h_pct: f64,
    pub market_cap: f64,
    pub volume_24h: f64,
    pub all_time_high: f64,
    pub circulating_supply: f64,
}

/// Blockchain-level statistics.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkStats {
    /// Hash rate in EH/s.
    pub hash_rate_ehs: f64,
    pub difficulty: f64,
    pub block_height: u64,
    pub avg_block_time_minutes: f64,
    pub avg_block_size_bytes: f64,
    pub total_btc_mined: f64,
}

/// Fee tiers (sat/vB) and mempool backlog.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MempoolStats {
    pub fastest_fee: f64,
    pub half_hour_fee: f64,
    pub hour_fee: f64,
    pub economy_fee: f64,
    pub minimum_fee: f64,
    pub tx_count: u64,
    pub vsize_bytes: u64,
    pub total_fee_btc: f64,
    /// Projected blocks needed to clear the mempool.
    pub pending_blocks: u32,
}

/// Fear & greed sentiment index.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FearGreed {
    /// 0 (extreme fear) to 100 (extreme greed).
    pub value: u8,
    pub classification: String,
}

/// Next subsidy halving, projected from the current height.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HalvingEstimate {
    pub next_halving_height: u64,
    pub blocks_remaining: u64,
    pub estimated_at: DateTime<Utc>,
}

impl HalvingEstimate {
    /// Project the next halving. Returns `None` for an unknown (zero) height.
    ///
    /// A non-positive block time falls back to the ten minute target.
    pub fn project(block_height: u64, avg_block_minutes: f64, now: DateTime<Utc>) -> Option<Self> {
        if block_height == 0 {
            return None;
        }
        let next_halving_height = (block_height / HALVING_INTERVAL + 1) * HALVING_INTERVAL;
        let blocks_remaining = next_halving_height - block_height;
        let minutes_per_block = if avg_block_minutes > 0.0 {
            avg_block_minutes
        } else {
            DEFAULT_BLOCK_TIME_MINUTES
        };
        let seconds = (blocks_remaining as f64 * minutes_per_block * 60.0).round() as i64;

        Some(Self {
            next_halving_height,
            blocks_remaining,
            estimated_at: now + ChronoDuration::seconds(seconds),
        })
    }
}

/// Composite record for the priority `bitcoin-network` dataset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BitcoinNetworkSnapshot {
    pub market: BitcoinMarket,
    pub network: NetworkStats,
    pub mempool: MempoolStats,
    /// Absent when the sentiment provider failed.
    pub sentiment: Option<FearGreed>,
    /// Absent when the block height is unknown.
    pub halving: Option<HalvingEstimate>,
    /// Sections that were filled from defaults because their provider failed.
    pub degraded: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

impl BitcoinNetworkSnapshot {
    pub fn price(&self) -> Decimal {
        self.market.price
    }
}

/// Price snapshot for a single coin.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinQuote {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub price: Decimal,
    pub change_24h_pct: f64,
    pub volume_24h: f64,
    pub market_cap: f64,
    pub market_cap_rank: Option<u32>,
}

/// A coin's 24h move measured against bitcoin's.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelativePerformance {
    pub coin: CoinQuote,
    /// Coin change minus bitcoin change, in percentage points.
    pub vs_btc_pct: f64,
}

/// Top 100 coins split by whether they beat bitcoin over 24h.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Top100VsBtc {
    pub btc_change_24h_pct: f64,
    /// Sorted best first.
    pub outperforming: Vec<RelativePerformance>,
    /// Sorted worst first.
    pub underperforming: Vec<RelativePerformance>,
    pub total_compared: usize,
}

impl Top100VsBtc {
    pub fn outperforming_count(&self) -> usize {
        self.outperforming.len()
    }
}

/// Largest 24h gainers and losers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopMovers {
    pub gainers: Vec<CoinQuote>,
    pub losers: Vec<CoinQuote>,
}

/// Entry from the trending search list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendingCoin {
    pub id: String,
    pub name: String,
    pub symbol: String,
    pub market_cap_rank: Option<u32>,
    /// Position in the trending list, 0 is hottest.
    pub score: u32,
    pub price_btc: f64,
}

/// Trending decentralized exchange pool.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DexPool {
    pub name: String,
    pub network: String,
    pub dex: String,
    pub base_token_price_usd: f64,
    pub volume_24h_usd: f64,
    pub price_change_24h_pct: f64,
    pub liquidity_usd: f64,
    pub transactions_24h: u64,
}

/// Marketplace statistics for an NFT collection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NftCollectionStats {
    pub slug: String,
    pub floor_price: f64,
    pub floor_price_symbol: String,
    pub volume_24h: f64,
    pub volume_change_24h_pct: f64,
    pub sales_24h: u64,
    pub average_price_24h: f64,
    pub owners: u64,
    pub total_volume: f64,
}

/// Latest quote for an equity or index.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquityQuote {
    pub symbol: String,
    pub price: Decimal,
    pub previous_close: Decimal,
    pub change: Decimal,
    pub change_pct: f64,
    pub currency: String,
}

/// Where a macro reading came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReadingSource {
    Upstream,
    /// Documented constant used when the provider is unavailable.
    Fallback,
}

/// Single macro data point.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MacroReading {
    pub value: f64,
    pub as_of: Option<NaiveDate>,
    pub source: ReadingSource,
}

impl MacroReading {
    pub fn upstream(value: f64, as_of: Option<NaiveDate>) -> Self {
        Self {
            value,
            as_of,
            source: ReadingSource::Upstream,
        }
    }

    pub fn fallback(value: f64) -> Self {
        Self {
            value,
            as_of: None,
            source: ReadingSource::Fallback,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.source == ReadingSource::Fallback
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MacroIndicators {
    pub dollar_index: MacroReading,
    pub treasury_10y_yield: MacroReading,
}
