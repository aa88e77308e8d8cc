//! Market feed models
//!
//! This module contains the core data types shared across the crate:
//! - `types` - Provider identifiers
//! - `dataset` - Dataset keys and the tagged record union stored in the cache
//! - `records` - Normalized, provider-agnostic records
//! - `defaults` - Central table of missing-field defaults and fallbacks

pub mod defaults;
mod dataset;
mod records;
mod types;

pub use dataset::{DatasetKey, DatasetValue};
pub use records::{
    BitcoinMarket, BitcoinNetworkSnapshot, CoinQuote, DexPool, EquityQuote, FearGreed,
    HalvingEstimate, MacroIndicators, MacroReading, MempoolStats, NetworkStats,
    NftCollectionStats, ReadingSource, RelativePerformance, Top100VsBtc, TopMovers, TrendingCoin,
};
pub use types::providers;
