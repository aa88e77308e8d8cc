//! Provider client: one entry point over every upstream provider.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::alternative_me::AlternativeMeProvider;
use super::blockchain::BlockchainProvider;
use super::coingecko::CoinGeckoProvider;
use super::fred::FredProvider;
use super::geckoterminal::GeckoTerminalProvider;
use super::mempool::MempoolProvider;
use super::opensea::OpenSeaProvider;
use super::traits::DatasetSource;
use super::upstream::{ApiKeyPlacement, Upstream};
use super::yahoo::YahooProvider;
use crate::clock::{Clock, SystemClock};
use crate::config::{CuratedLists, FeedConfig};
use crate::errors::FeedError;
use crate::http::{HttpTransport, ReqwestTransport, ResilientFetcher};
use crate::models::{
    providers, BitcoinMarket, BitcoinNetworkSnapshot, CoinQuote, DatasetKey, DatasetValue, DexPool,
    EquityQuote, FearGreed, HalvingEstimate, MacroIndicators, MacroReading, MempoolStats,
    NetworkStats, NftCollectionStats, Top100VsBtc, TopMovers, TrendingCoin,
};
use crate::rate_limiter::RateLimiter;

/// Yahoo and FRED throttle briefly; a shorter 429 fallback keeps cycles moving.
const SHORT_RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(5);

/// Section names reported in `BitcoinNetworkSnapshot::degraded`.
pub const SECTION_NETWORK: &str = "network";
pub const SECTION_MEMPOOL: &str = "mempool";
pub const SECTION_SENTIMENT: &str = "sentiment";

/// Typed methods for every upstream, sharing one rate limiter and one
/// resilient fetcher.
pub struct MarketClient {
    coingecko: CoinGeckoProvider,
    blockchain: BlockchainProvider,
    mempool: MempoolProvider,
    alternative_me: AlternativeMeProvider,
    yahoo: YahooProvider,
    fred: FredProvider,
    geckoterminal: GeckoTerminalProvider,
    opensea: OpenSeaProvider,
    curated: CuratedLists,
    limiter: Arc<RateLimiter>,
    clock: Arc<dyn Clock>,
}

impl MarketClient {
    pub fn new(config: &FeedConfig, transport: Arc<dyn HttpTransport>, clock: Arc<dyn Clock>) -> Self {
        let fetcher = Arc::new(ResilientFetcher::new(transport, clock.clone()));
        let limiter = Arc::new(RateLimiter::new(clock.clone()));

        let upstream = |id: &'static str, placement: ApiKeyPlacement| {
            let options = match id {
                providers::YAHOO | providers::FRED => config
                    .fetch
                    .clone()
                    .with_rate_limit_backoff(SHORT_RATE_LIMIT_BACKOFF),
                _ => config.fetch.clone(),
            };
            Upstream::new(
                id,
                config.provider(id),
                placement,
                fetcher.clone(),
                limiter.clone(),
                options,
            )
        };

        Self {
            coingecko: CoinGeckoProvider::new(upstream(
                providers::COINGECKO,
                ApiKeyPlacement::Header("x-cg-pro-api-key"),
            )),
            blockchain: BlockchainProvider::new(upstream(
                providers::BLOCKCHAIN,
                ApiKeyPlacement::NotRequired,
            )),
            mempool: MempoolProvider::new(upstream(providers::MEMPOOL, ApiKeyPlacement::NotRequired)),
            alternative_me: AlternativeMeProvider::new(upstream(
                providers::ALTERNATIVE_ME,
                ApiKeyPlacement::NotRequired,
            )),
            yahoo: YahooProvider::new(upstream(providers::YAHOO, ApiKeyPlacement::NotRequired)),
            fred: FredProvider::new(upstream(providers::FRED, ApiKeyPlacement::Query("api_key"))),
            geckoterminal: GeckoTerminalProvider::new(upstream(
                providers::GECKOTERMINAL,
                ApiKeyPlacement::NotRequired,
            )),
            opensea: OpenSeaProvider::new(upstream(
                providers::OPENSEA,
                ApiKeyPlacement::Header("x-api-key"),
            )),
            curated: config.curated.clone(),
            limiter,
            clock,
        }
    }

    /// Client over real HTTP and wall-clock time.
    pub fn from_config(config: &FeedConfig) -> Self {
        Self::new(
            config,
            Arc::new(ReqwestTransport::new()),
            Arc::new(SystemClock),
        )
    }

    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    pub fn curated(&self) -> &CuratedLists {
        &self.curated
    }

    pub async fn bitcoin_market(&self) -> Result<BitcoinMarket, FeedError> {
        self.coingecko.bitcoin_market().await
    }

    pub async fn network_stats(&self) -> Result<NetworkStats, FeedError> {
        self.blockchain.network_stats().await
    }

    pub async fn mempool_stats(&self) -> Result<MempoolStats, FeedError> {
        self.mempool.mempool_stats().await
    }

    pub async fn fear_greed(&self) -> Result<FearGreed, FeedError> {
        self.alternative_me.fear_greed().await
    }

    pub async fn altcoin_quotes(&self, ids: &[String]) -> Result<Vec<CoinQuote>, FeedError> {
        self.coingecko.altcoin_quotes(ids).await
    }

    pub async fn equity_quote(&self, symbol: &str) -> Result<EquityQuote, FeedError> {
        self.yahoo.equity_quote(symbol).await
    }

    pub async fn stock_quotes(&self, symbols: &[String]) -> Result<Vec<EquityQuote>, FeedError> {
        self.yahoo.stock_quotes(symbols).await
    }

    pub async fn dollar_index(&self) -> MacroReading {
        self.fred.dollar_index().await
    }

    pub async fn treasury_yield_10y(&self) -> MacroReading {
        self.fred.treasury_yield_10y().await
    }

    pub async fn macro_indicators(&self) -> Result<MacroIndicators, FeedError> {
        self.fred.macro_indicators().await
    }

    pub async fn top100_vs_btc(&self) -> Result<Top100VsBtc, FeedError> {
        self.coingecko.top100_vs_btc().await
    }

    pub async fn top_movers(&self) -> Result<TopMovers, FeedError> {
        self.coingecko.top_movers().await
    }

    pub async fn trending_coins(&self) -> Result<Vec<TrendingCoin>, FeedError> {
        self.coingecko.trending_coins().await
    }

    pub async fn dex_trending(&self) -> Result<Vec<DexPool>, FeedError> {
        self.geckoterminal.dex_trending().await
    }

    pub async fn curated_nfts(&self, slugs: &[String]) -> Result<Vec<NftCollectionStats>, FeedError> {
        self.opensea.curated_nfts(slugs).await
    }

    /// Composite bitcoin record.
    ///
    /// The market section is mandatory. Network, mempool and sentiment are
    /// fetched concurrently; a failed section is replaced by its default
    /// (sentiment becomes absent) and listed in `degraded`.
    pub async fn bitcoin_network(&self) -> Result<BitcoinNetworkSnapshot, FeedError> {
        let market = self.bitcoin_market().await?;

        let (network, mempool, sentiment) =
            tokio::join!(self.network_stats(), self.mempool_stats(), self.fear_greed());

        let mut degraded = Vec::new();
        let network = network.unwrap_or_else(|e| {
            warn!(section = SECTION_NETWORK, "Using default network stats: {}", e);
            degraded.push(SECTION_NETWORK.to_string());
            NetworkStats::default()
        });
        let mempool = mempool.unwrap_or_else(|e| {
            warn!(section = SECTION_MEMPOOL, "Using default mempool stats: {}", e);
            degraded.push(SECTION_MEMPOOL.to_string());
            MempoolStats::default()
        });
        let sentiment = match sentiment {
            Ok(index) => Some(index),
            Err(e) => {
                warn!(section = SECTION_SENTIMENT, "Sentiment unavailable: {}", e);
                degraded.push(SECTION_SENTIMENT.to_string());
                None
            }
        };

        let now = self.now();
        let halving = HalvingEstimate::project(network.block_height, network.avg_block_time_minutes, now);

        Ok(BitcoinNetworkSnapshot {
            market,
            network,
            mempool,
            sentiment,
            halving,
            degraded,
            updated_at: now,
        })
    }

    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.clock.now_millis()).unwrap_or_else(Utc::now)
    }
}

#[async_trait]
impl DatasetSource for MarketClient {
    async fn fetch_dataset(&self, key: DatasetKey) -> Result<DatasetValue, FeedError> {
        debug!(dataset = key.as_str(), "Fetching dataset");
        let value = match key {
            DatasetKey::BitcoinNetwork => DatasetValue::BitcoinNetwork(self.bitcoin_network().await?),
            DatasetKey::CuratedAltcoins => {
                DatasetValue::CuratedAltcoins(self.altcoin_quotes(&self.curated.altcoins).await?)
            }
            DatasetKey::Top100VsBtc => DatasetValue::Top100VsBtc(self.top100_vs_btc().await?),
            DatasetKey::DexTrending => DatasetValue::DexTrending(self.dex_trending().await?),
            DatasetKey::TopMovers => DatasetValue::TopMovers(self.top_movers().await?),
            DatasetKey::TrendingCoins => DatasetValue::TrendingCoins(self.trending_coins().await?),
            DatasetKey::CuratedNfts => {
                DatasetValue::CuratedNfts(self.curated_nfts(&self.curated.nft_collections).await?)
            }
            DatasetKey::CuratedStocks => {
                DatasetValue::CuratedStocks(self.stock_quotes(&self.curated.stocks).await?)
            }
            DatasetKey::MacroIndicators => DatasetValue::MacroIndicators(self.macro_indicators().await?),
        };
        Ok(value)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::http::mock::MockTransport;

    pub const BITCOIN: &str = r#"{"market_data": {
        "current_price": {"usd": 64123.45},
        "market_cap": {"usd": 1260000000000.0},
        "total_volume": {"usd": 31000000000.0},
        "ath": {"usd": 73738.0},
        "price_change_percentage_24h": 2.5,
        "circulating_supply": 19700000.0
    }}"#;

    pub const STATS: &str = r#"{"hash_rate": 650000000000.0, "difficulty": 8.3e13, "n_blocks_total": 839999, "minutes_between_blocks": 10.0, "totalbc": 1970000000000000}"#;

    pub const FEES: &str =
        r#"{"fastestFee": 24, "halfHourFee": 18, "hourFee": 12, "economyFee": 6, "minimumFee": 3}"#;

    pub const FEAR_GREED: &str = r#"{"data": [{"value": "72", "value_classification": "Greed"}]}"#;

    /// Client pointed at `https://feed.test` for every provider.
    pub fn client(transport: Arc<MockTransport>, clock: Arc<dyn Clock>) -> MarketClient {
        let config = FeedConfig::default().with_base_url_for_all("https://feed.test");
        MarketClient::new(&config, transport, clock)
    }

    /// Routes for a fully healthy bitcoin composite.
    pub fn healthy_bitcoin_routes(transport: &MockTransport) {
        transport
            .on_json("/coins/bitcoin", BITCOIN)
            .on_json("/stats", STATS)
            .on_json("/v1/fees/recommended", FEES)
            .on_json("/mempool", r#"{"count": 42000, "vsize": 31000000, "total_fee": 25000000}"#)
            .on_json("/v1/fees/mempool-blocks", r#"[{"nTx": 3000}]"#)
            .on_json("/fng/", FEAR_GREED);
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::cache::{CachePolicies, DatasetCache, FailureAction, RefreshOutcome};
    use crate::clock::ManualClock;
    use crate::http::mock::MockTransport;
    use crate::http::HttpResponse;
    use crate::models::defaults::NETWORK_DEFAULTS;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_bitcoin_network_composite() {
        let clock = ManualClock::new(1_718_841_600_000);
        let transport = Arc::new(MockTransport::new());
        healthy_bitcoin_routes(&transport);

        let snapshot = client(transport.clone(), clock).bitcoin_network().await.unwrap();

        assert_eq!(snapshot.price(), dec!(64123.45));
        assert_eq!(snapshot.network.block_height, 839_999);
        assert_eq!(snapshot.mempool.pending_blocks, 1);
        assert_eq!(snapshot.sentiment.as_ref().map(|s| s.value), Some(72));
        assert!(snapshot.degraded.is_empty());

        let halving = snapshot.halving.unwrap();
        assert_eq!(halving.next_halving_height, 840_000);
        assert_eq!(halving.blocks_remaining, 1);
        assert_eq!(
            halving.estimated_at.timestamp_millis(),
            1_718_841_600_000 + 10 * 60 * 1000
        );
        assert_eq!(snapshot.updated_at.timestamp_millis(), 1_718_841_600_000);
    }

    #[tokio::test]
    async fn test_bitcoin_network_degrades_optional_sections() {
        let clock = ManualClock::new(0);
        let transport = Arc::new(MockTransport::new());
        transport
            .on_json("/coins/bitcoin", BITCOIN)
            .on("/stats", Ok(HttpResponse::status(500)))
            .on_json("/v1/fees/recommended", FEES)
            .on_json("/mempool", "{}")
            .on_json("/v1/fees/mempool-blocks", "[]")
            .on("/fng/", Ok(HttpResponse::status(404)));

        let snapshot = client(transport, clock).bitcoin_network().await.unwrap();

        assert_eq!(snapshot.price(), dec!(64123.45));
        assert_eq!(snapshot.network, NETWORK_DEFAULTS);
        assert!(snapshot.sentiment.is_none());
        assert!(snapshot.halving.is_none());
        assert_eq!(snapshot.degraded, vec![SECTION_NETWORK, SECTION_SENTIMENT]);
    }

    #[tokio::test]
    async fn test_bitcoin_network_requires_market() {
        let clock = ManualClock::new(0);
        let transport = Arc::new(MockTransport::new());
        healthy_bitcoin_routes(&transport);
        transport.on("/coins/bitcoin", Ok(HttpResponse::status(404)));

        // Queued after the healthy body, so the first call still succeeds.
        let client = client(transport.clone(), clock);
        assert!(client.bitcoin_network().await.is_ok());
        assert!(client.bitcoin_network().await.is_err());
    }

    #[tokio::test]
    async fn test_fetch_dataset_dispatch() {
        let clock = ManualClock::new(0);
        let transport = Arc::new(MockTransport::new());
        transport.on_json(
            "/simple/price",
            r#"{"ethereum": {"usd": 3500.0, "usd_24h_change": 1.0}, "solana": {"usd": 150.0}}"#,
        );

        let client = client(transport.clone(), clock);
        let value = client.fetch_dataset(DatasetKey::CuratedAltcoins).await.unwrap();

        assert_eq!(value.key(), DatasetKey::CuratedAltcoins);
        let request = &transport.calls()[0];
        assert_eq!(request.url, "https://feed.test/simple/price");
        assert_eq!(
            request.query_value("ids"),
            Some(client.curated().altcoins.join(",").as_str())
        );
    }

    const DOLLAR_INDEX: &str = r#"{"observations": [{"date": "2024-06-18", "value": "101.5"}]}"#;

    fn macro_cache(transport: Arc<MockTransport>, clock: Arc<ManualClock>, fred_key: bool) -> DatasetCache {
        let config = FeedConfig::from_lookup(|key| {
            (fred_key && key == "FRED_API_KEY").then(|| "fred-key".to_string())
        })
        .with_base_url_for_all("https://feed.test");
        let client = MarketClient::new(&config, transport, clock.clone());
        DatasetCache::new(Arc::new(client), CachePolicies::default(), clock)
    }

    #[tokio::test]
    async fn test_macro_failure_keeps_last_good_reading() {
        let clock = ManualClock::new(0);
        let transport = Arc::new(MockTransport::new());
        transport
            .on_json("/series/observations", DOLLAR_INDEX)
            .on_json("/series/observations", DOLLAR_INDEX)
            .on("/series/observations", Ok(HttpResponse::status(500)));
        let cache = macro_cache(transport, clock.clone(), true);

        assert!(matches!(
            cache.refresh(DatasetKey::MacroIndicators).await,
            RefreshOutcome::Refreshed
        ));

        clock.advance(Duration::from_secs(3601));
        let outcome = cache.refresh_if_stale(DatasetKey::MacroIndicators).await;
        assert!(matches!(
            outcome,
            RefreshOutcome::Failed {
                action: FailureAction::KeptStale,
                ..
            }
        ));

        let served = cache.snapshot(DatasetKey::MacroIndicators).unwrap();
        assert!(served.is_stale);
        assert!(!served.is_fallback);
        match served.data.as_ref() {
            DatasetValue::MacroIndicators(indicators) => {
                assert_eq!(indicators.dollar_index.value, 101.5);
                assert!(!indicators.dollar_index.is_fallback());
            }
            other => panic!("unexpected dataset {:?}", other.key()),
        }
    }

    #[tokio::test]
    async fn test_macro_without_key_seeds_fallback() {
        let clock = ManualClock::new(0);
        let transport = Arc::new(MockTransport::new());
        let cache = macro_cache(transport.clone(), clock, false);

        let outcome = cache.refresh(DatasetKey::MacroIndicators).await;

        assert!(matches!(
            outcome,
            RefreshOutcome::Failed {
                error: FeedError::MissingApiKey { .. },
                action: FailureAction::SeededFallback,
            }
        ));
        let served = cache.snapshot(DatasetKey::MacroIndicators).unwrap();
        assert!(served.is_fallback);
        assert!(!cache.is_valid(DatasetKey::MacroIndicators));
        assert!(transport.calls().is_empty());
    }

    #[test]
    fn test_rate_limits_registered() {
        let clock: Arc<dyn Clock> = ManualClock::new(0);
        let client = client(Arc::new(MockTransport::new()), clock);

        assert_eq!(client.rate_limiter().limit_for(providers::COINGECKO), 30);
        assert_eq!(client.rate_limiter().limit_for(providers::FRED), 120);
        assert_eq!(client.rate_limiter().limit_for(providers::GECKOTERMINAL), 30);
    }
}
