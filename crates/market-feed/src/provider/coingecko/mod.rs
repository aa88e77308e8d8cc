//! CoinGecko provider: bitcoin market data, altcoin batches, top-100
//! rankings and the trending list.
//!
//! Free tier is limited to roughly 30 calls per minute; a pro key switches
//! to the pro endpoint (see config).

mod models;

use std::cmp::Ordering;

use tracing::warn;

use self::models::{
    usd, CoinDetailResponse, MarketCoin, SimplePrice, TrendingResponse,
};
use super::to_decimal;
use super::upstream::Upstream;
use crate::errors::FeedError;
use crate::models::defaults::COIN_NUMERIC_DEFAULT;
use crate::models::{
    providers, BitcoinMarket, CoinQuote, RelativePerformance, Top100VsBtc, TopMovers,
    TrendingCoin,
};

const PROVIDER_ID: &str = providers::COINGECKO;

/// Coins excluded from relative-performance comparisons.
const STABLECOIN_SYMBOLS: &[&str] = &[
    "usdt", "usdc", "dai", "fdusd", "usde", "tusd", "usds", "pyusd", "usdd", "busd",
];

/// Gainers and losers reported in the top movers dataset.
pub const TOP_MOVERS_COUNT: usize = 4;

/// CoinGecko market data client.
pub struct CoinGeckoProvider {
    upstream: Upstream,
}

impl CoinGeckoProvider {
    pub fn new(upstream: Upstream) -> Self {
        Self { upstream }
    }

    /// Bitcoin market snapshot. Raises when the USD price is missing.
    pub async fn bitcoin_market(&self) -> Result<BitcoinMarket, FeedError> {
        let request = self
            .upstream
            .request("/coins/bitcoin")
            .query("localization", "false")
            .query("tickers", "false")
            .query("community_data", "false")
            .query("developer_data", "false");
        let response: CoinDetailResponse = self.upstream.get_json(request).await?;
        map_bitcoin_market(response)
    }

    /// Batch quotes for the given coin ids, in the order requested.
    pub async fn altcoin_quotes(&self, ids: &[String]) -> Result<Vec<CoinQuote>, FeedError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let request = self
            .upstream
            .request("/simple/price")
            .query("ids", ids.join(","))
            .query("vs_currencies", "usd")
            .query("include_24hr_change", "true")
            .query("include_24hr_vol", "true")
            .query("include_market_cap", "true");
        let response: std::collections::HashMap<String, SimplePrice> =
            self.upstream.get_json(request).await?;
        map_simple_prices(ids, response)
    }

    /// Top 100 coins by market cap.
    pub async fn top_markets(&self) -> Result<Vec<CoinQuote>, FeedError> {
        let request = self
            .upstream
            .request("/coins/markets")
            .query("vs_currency", "usd")
            .query("order", "market_cap_desc")
            .query("per_page", "100")
            .query("page", "1")
            .query("price_change_percentage", "24h");
        let rows: Vec<MarketCoin> = self.upstream.get_json(request).await?;
        Ok(rows.into_iter().filter_map(map_market_coin).collect())
    }

    /// Top 100 split into coins beating and trailing bitcoin over 24h.
    pub async fn top100_vs_btc(&self) -> Result<Top100VsBtc, FeedError> {
        let coins = self.top_markets().await?;
        compare_with_bitcoin(coins)
    }

    /// Biggest gainers and losers of the top 100.
    pub async fn top_movers(&self) -> Result<TopMovers, FeedError> {
        let coins = self.top_markets().await?;
        Ok(rank_movers(coins, TOP_MOVERS_COUNT))
    }

    pub async fn trending_coins(&self) -> Result<Vec<TrendingCoin>, FeedError> {
        let request = self.upstream.request("/search/trending");
        let response: TrendingResponse = self.upstream.get_json(request).await?;
        Ok(map_trending(response))
    }
}

fn map_bitcoin_market(response: CoinDetailResponse) -> Result<BitcoinMarket, FeedError> {
    let data = response
        .market_data
        .ok_or_else(|| FeedError::missing_field(PROVIDER_ID, "market_data"))?;
    let price = usd(&data.current_price)
        .ok_or_else(|| FeedError::missing_field(PROVIDER_ID, "market_data.current_price.usd"))?;

    Ok(BitcoinMarket {
        price: to_decimal(PROVIDER_ID, "current_price.usd", price)?,
        change_24h_pct: data
            .price_change_percentage_24h
            .unwrap_or(COIN_NUMERIC_DEFAULT),
        market_cap: usd(&data.market_cap).unwrap_or(COIN_NUMERIC_DEFAULT),
        volume_24h: usd(&data.total_volume).unwrap_or(COIN_NUMERIC_DEFAULT),
        all_time_high: usd(&data.ath).unwrap_or(COIN_NUMERIC_DEFAULT),
        circulating_supply: data.circulating_supply.unwrap_or(COIN_NUMERIC_DEFAULT),
    })
}

fn map_simple_prices(
    ids: &[String],
    mut response: std::collections::HashMap<String, SimplePrice>,
) -> Result<Vec<CoinQuote>, FeedError> {
    let mut quotes = Vec::with_capacity(ids.len());
    for id in ids {
        let Some(entry) = response.remove(id) else {
            warn!(provider = PROVIDER_ID, "No price returned for '{}'", id);
            continue;
        };
        let Some(price) = entry.usd else {
            warn!(provider = PROVIDER_ID, "No USD price for '{}'", id);
            continue;
        };
        let Ok(price) = to_decimal(PROVIDER_ID, "usd", price) else {
            continue;
        };
        quotes.push(CoinQuote {
            id: id.clone(),
            symbol: String::new(),
            name: id.clone(),
            price,
            change_24h_pct: entry.usd_24h_change.unwrap_or(COIN_NUMERIC_DEFAULT),
            volume_24h: entry.usd_24h_vol.unwrap_or(COIN_NUMERIC_DEFAULT),
            market_cap: entry.usd_market_cap.unwrap_or(COIN_NUMERIC_DEFAULT),
            market_cap_rank: None,
        });
    }

    if quotes.is_empty() {
        return Err(FeedError::missing_field(PROVIDER_ID, "usd"));
    }
    Ok(quotes)
}

/// Rows without a usable price are dropped.
fn map_market_coin(row: MarketCoin) -> Option<CoinQuote> {
    let price = to_decimal(PROVIDER_ID, "current_price", row.current_price?).ok()?;
    Some(CoinQuote {
        id: row.id,
        symbol: row.symbol.to_uppercase(),
        name: row.name,
        price,
        change_24h_pct: row
            .price_change_percentage_24h
            .unwrap_or(COIN_NUMERIC_DEFAULT),
        volume_24h: row.total_volume.unwrap_or(COIN_NUMERIC_DEFAULT),
        market_cap: row.market_cap.unwrap_or(COIN_NUMERIC_DEFAULT),
        market_cap_rank: row.market_cap_rank,
    })
}

fn is_stablecoin(coin: &CoinQuote) -> bool {
    STABLECOIN_SYMBOLS.contains(&coin.symbol.to_lowercase().as_str())
}

fn by_change_desc(a: &CoinQuote, b: &CoinQuote) -> Ordering {
    b.change_24h_pct
        .partial_cmp(&a.change_24h_pct)
        .unwrap_or(Ordering::Equal)
}

/// Compare every non-stable coin with bitcoin's 24h change.
///
/// Bitcoin's own change is the base of every comparison, so its absence is
/// an error rather than a defaulted zero.
fn compare_with_bitcoin(coins: Vec<CoinQuote>) -> Result<Top100VsBtc, FeedError> {
    let btc_change = coins
        .iter()
        .find(|c| c.id == "bitcoin")
        .map(|c| c.change_24h_pct)
        .ok_or_else(|| FeedError::missing_field(PROVIDER_ID, "bitcoin.price_change_percentage_24h"))?;

    let (mut outperforming, mut underperforming): (Vec<_>, Vec<_>) = coins
        .into_iter()
        .filter(|c| c.id != "bitcoin" && !is_stablecoin(c))
        .map(|coin| RelativePerformance {
            vs_btc_pct: coin.change_24h_pct - btc_change,
            coin,
        })
        .partition(|p| p.vs_btc_pct > 0.0);

    outperforming.sort_by(|a, b| b.vs_btc_pct.partial_cmp(&a.vs_btc_pct).unwrap_or(Ordering::Equal));
    underperforming.sort_by(|a, b| a.vs_btc_pct.partial_cmp(&b.vs_btc_pct).unwrap_or(Ordering::Equal));

    Ok(Top100VsBtc {
        btc_change_24h_pct: btc_change,
        total_compared: outperforming.len() + underperforming.len(),
        outperforming,
        underperforming,
    })
}

fn rank_movers(mut coins: Vec<CoinQuote>, count: usize) -> TopMovers {
    coins.retain(|c| !is_stablecoin(c));
    coins.sort_by(by_change_desc);

    let gainers: Vec<CoinQuote> = coins
        .iter()
        .filter(|c| c.change_24h_pct > 0.0)
        .take(count)
        .cloned()
        .collect();
    let losers: Vec<CoinQuote> = coins
        .iter()
        .rev()
        .filter(|c| c.change_24h_pct < 0.0)
        .take(count)
        .cloned()
        .collect();

    TopMovers { gainers, losers }
}

fn map_trending(response: TrendingResponse) -> Vec<TrendingCoin> {
    response
        .coins
        .into_iter()
        .enumerate()
        .map(|(position, entry)| TrendingCoin {
            score: entry.item.score.unwrap_or(position as u32),
            id: entry.item.id,
            name: entry.item.name,
            symbol: entry.item.symbol.to_uppercase(),
            market_cap_rank: entry.item.market_cap_rank,
            price_btc: entry.item.price_btc.unwrap_or(COIN_NUMERIC_DEFAULT),
        })
        .collect()
}
