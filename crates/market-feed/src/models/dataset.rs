use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::records::{
    BitcoinNetworkSnapshot, CoinQuote, DexPool, EquityQuote, MacroIndicators,
    NftCollectionStats, Top100VsBtc, TopMovers, TrendingCoin,
};
use crate::errors::FeedError;

/// Identifier of one independently cached data feed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DatasetKey {
    #[serde(rename = "bitcoin-network")]
    BitcoinNetwork,
    #[serde(rename = "curated-altcoins")]
    CuratedAltcoins,
    #[serde(rename = "top100-vs-btc")]
    Top100VsBtc,
    #[serde(rename = "dex-trending")]
    DexTrending,
    #[serde(rename = "top-movers")]
    TopMovers,
    #[serde(rename = "trending-coins")]
    TrendingCoins,
    #[serde(rename = "curated-nfts")]
    CuratedNfts,
    #[serde(rename = "curated-stocks")]
    CuratedStocks,
    #[serde(rename = "macro-indicators")]
    MacroIndicators,
}

impl DatasetKey {
    /// Every dataset, in refresh order. The first one is the priority feed.
    pub const ALL: [DatasetKey; 9] = [
        DatasetKey::BitcoinNetwork,
        DatasetKey::CuratedAltcoins,
        DatasetKey::Top100VsBtc,
        DatasetKey::DexTrending,
        DatasetKey::TopMovers,
        DatasetKey::TrendingCoins,
        DatasetKey::CuratedNfts,
        DatasetKey::CuratedStocks,
        DatasetKey::MacroIndicators,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BitcoinNetwork => "bitcoin-network",
            Self::CuratedAltcoins => "curated-altcoins",
            Self::Top100VsBtc => "top100-vs-btc",
            Self::DexTrending => "dex-trending",
            Self::TopMovers => "top-movers",
            Self::TrendingCoins => "trending-coins",
            Self::CuratedNfts => "curated-nfts",
            Self::CuratedStocks => "curated-stocks",
            Self::MacroIndicators => "macro-indicators",
        }
    }

    /// Upper snake case form used in environment variable names.
    pub fn env_name(&self) -> String {
        self.as_str().replace('-', "_").to_ascii_uppercase()
    }
}

impl fmt::Display for DatasetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatasetKey {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| FeedError::UnknownDataset(s.to_string()))
    }
}

/// Normalized record for any dataset.
///
/// Nothing upstream-specific crosses this type: every provider response is
/// mapped into one of these shapes before it reaches the cache.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "dataset", content = "data")]
pub enum DatasetValue {
    #[serde(rename = "bitcoin-network")]
    BitcoinNetwork(BitcoinNetworkSnapshot),
    #[serde(rename = "curated-altcoins")]
    CuratedAltcoins(Vec<CoinQuote>),
    #[serde(rename = "top100-vs-btc")]
    Top100VsBtc(Top100VsBtc),
    #[serde(rename = "dex-trending")]
    DexTrending(Vec<DexPool>),
    #[serde(rename = "top-movers")]
    TopMovers(TopMovers),
    #[serde(rename = "trending-coins")]
    TrendingCoins(Vec<TrendingCoin>),
    #[serde(rename = "curated-nfts")]
    CuratedNfts(Vec<NftCollectionStats>),
    #[serde(rename = "curated-stocks")]
    CuratedStocks(Vec<EquityQuote>),
    #[serde(rename = "macro-indicators")]
    MacroIndicators(MacroIndicators),
}

impl DatasetValue {
    /// The dataset this value belongs to.
    pub fn key(&self) -> DatasetKey {
        match self {
            Self::BitcoinNetwork(_) => DatasetKey::BitcoinNetwork,
            Self::CuratedAltcoins(_) => DatasetKey::CuratedAltcoins,
            Self::Top100VsBtc(_) => DatasetKey::Top100VsBtc,
            Self::DexTrending(_) => DatasetKey::DexTrending,
            Self::TopMovers(_) => DatasetKey::TopMovers,
            Self::TrendingCoins(_) => DatasetKey::TrendingCoins,
            Self::CuratedNfts(_) => DatasetKey::CuratedNfts,
            Self::CuratedStocks(_) => DatasetKey::CuratedStocks,
            Self::MacroIndicators(_) => DatasetKey::MacroIndicators,
        }
    }

    pub fn as_bitcoin_network(&self) -> Option<&BitcoinNetworkSnapshot> {
        match self {
            Self::BitcoinNetwork(snapshot) => Some(snapshot),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_round_trips_through_str() {
        for key in DatasetKey::ALL {
            assert_eq!(key.as_str().parse::<DatasetKey>().unwrap(), key);
            let json = serde_json::to_string(&key).unwrap();
            assert_eq!(json, format!("\"{}\"", key.as_str()));
        }
    }

    #[test]
    fn test_unknown_key() {
        let error = "bitcoin".parse::<DatasetKey>().unwrap_err();
        assert!(matches!(error, FeedError::UnknownDataset(ref s) if s == "bitcoin"));
    }

    #[test]
    fn test_priority_dataset_is_first() {
        assert_eq!(DatasetKey::ALL[0], DatasetKey::BitcoinNetwork);
    }

    #[test]
    fn test_env_name() {
        assert_eq!(DatasetKey::Top100VsBtc.env_name(), "TOP100_VS_BTC");
        assert_eq!(DatasetKey::BitcoinNetwork.env_name(), "BITCOIN_NETWORK");
    }

    #[test]
    fn test_value_is_tagged_with_key() {
        let value = DatasetValue::TrendingCoins(Vec::new());
        let json = serde_json::to_value(&value).unwrap();
        assert_eq!(json["dataset"], "trending-coins");
        assert_eq!(value.key(), DatasetKey::TrendingCoins);
    }
}
