//! Missing-field defaults, one table per dataset.
//!
//! Mapping code never invents numbers on its own; every substitute value
//! used when an optional upstream field or section is missing lives here.

use super::dataset::{DatasetKey, DatasetValue};
use super::records::{MacroIndicators, MacroReading, MempoolStats, NetworkStats};

/// Blocks between subsidy halvings.
pub const HALVING_INTERVAL: u64 = 210_000;

/// Target block interval, used when the observed average is unavailable.
pub const DEFAULT_BLOCK_TIME_MINUTES: f64 = 10.0;

/// US dollar index substitute when the macro provider is unavailable.
pub const DOLLAR_INDEX_FALLBACK: f64 = 104.2;

/// 10-year treasury yield (percent) substitute when unavailable.
pub const TREASURY_10Y_FALLBACK: f64 = 4.12;

/// Numeric coin fields (change, volume, market cap) missing upstream.
pub const COIN_NUMERIC_DEFAULT: f64 = 0.0;

/// Numeric DEX pool fields missing or unparseable upstream.
pub const DEX_NUMERIC_DEFAULT: f64 = 0.0;

/// DEX pool transaction count when the 24h window is absent.
pub const DEX_TRANSACTIONS_DEFAULT: u64 = 0;

/// Numeric NFT collection fields (prices, volumes) missing upstream.
pub const NFT_NUMERIC_DEFAULT: f64 = 0.0;

/// NFT sales and owner counts missing upstream.
pub const NFT_COUNT_DEFAULT: u64 = 0;

/// Floor price currency when OpenSea omits it.
pub const NFT_FLOOR_SYMBOL_DEFAULT: &str = "ETH";

/// Sentiment classification when the index omits it.
pub const FEAR_GREED_UNCLASSIFIED: &str = "Unknown";

/// Network section used when the blockchain stats provider fails.
pub const NETWORK_DEFAULTS: NetworkStats = NetworkStats {
    hash_rate_ehs: 0.0,
    difficulty: 0.0,
    block_height: 0,
    avg_block_time_minutes: DEFAULT_BLOCK_TIME_MINUTES,
    avg_block_size_bytes: 0.0,
    total_btc_mined: 0.0,
};

/// Mempool section used when the fee provider fails.
pub const MEMPOOL_DEFAULTS: MempoolStats = MempoolStats {
    fastest_fee: 0.0,
    half_hour_fee: 0.0,
    hour_fee: 0.0,
    economy_fee: 0.0,
    minimum_fee: 0.0,
    tx_count: 0,
    vsize_bytes: 0,
    total_fee_btc: 0.0,
    pending_blocks: 0,
};

impl Default for NetworkStats {
    fn default() -> Self {
        NETWORK_DEFAULTS
    }
}

impl Default for MempoolStats {
    fn default() -> Self {
        MEMPOOL_DEFAULTS
    }
}

impl Default for MacroIndicators {
    fn default() -> Self {
        Self {
            dollar_index: MacroReading::fallback(DOLLAR_INDEX_FALLBACK),
            treasury_10y_yield: MacroReading::fallback(TREASURY_10Y_FALLBACK),
        }
    }
}

/// Record substituted for a dataset that has never been fetched successfully.
///
/// Only datasets whose policy allows defaults have one.
pub fn fallback_value(key: DatasetKey) -> Option<DatasetValue> {
    match key {
        DatasetKey::MacroIndicators => {
            Some(DatasetValue::MacroIndicators(MacroIndicators::default()))
        }
        _ => None,
    }
}
