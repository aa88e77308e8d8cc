//! CoinGecko API response models.

use std::collections::HashMap;

use serde::Deserialize;

/// Per-currency amounts, e.g. `{"usd": 64000.0, "eur": 59000.0}`.
pub type CurrencyMap = HashMap<String, Option<f64>>;

pub fn usd(map: &CurrencyMap) -> Option<f64> {
    map.get("usd").copied().flatten()
}

/// Response from /coins/{id}
#[derive(Debug, Deserialize)]
pub struct CoinDetailResponse {
    pub market_data: Option<CoinMarketData>,
}

#[derive(Debug, Deserialize)]
pub struct CoinMarketData {
    #[serde(default)]
    pub current_price: CurrencyMap,
    #[serde(default)]
    pub market_cap: CurrencyMap,
    #[serde(default)]
    pub total_volume: CurrencyMap,
    #[serde(default)]
    pub ath: CurrencyMap,
    pub price_change_percentage_24h: Option<f64>,
    pub circulating_supply: Option<f64>,
}

/// One entry of the /simple/price map, keyed by coin id.
#[derive(Debug, Deserialize)]
pub struct SimplePrice {
    pub usd: Option<f64>,
    pub usd_24h_change: Option<f64>,
    pub usd_24h_vol: Option<f64>,
    pub usd_market_cap: Option<f64>,
}

/// Row from /coins/markets
#[derive(Debug, Deserialize)]
pub struct MarketCoin {
    pub id: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    pub current_price: Option<f64>,
    pub price_change_percentage_24h: Option<f64>,
    pub total_volume: Option<f64>,
    pub market_cap: Option<f64>,
    pub market_cap_rank: Option<u32>,
}

/// Response from /search/trending
#[derive(Debug, Deserialize)]
pub struct TrendingResponse {
    #[serde(default)]
    pub coins: Vec<TrendingEntry>,
    // Note: nfts and categories exist but are not used
}

#[derive(Debug, Deserialize)]
pub struct TrendingEntry {
    pub item: TrendingItem,
}

#[derive(Debug, Deserialize)]
pub struct TrendingItem {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub symbol: String,
    pub market_cap_rank: Option<u32>,
    pub score: Option<u32>,
    pub price_btc: Option<f64>,
}
