//! Environment-derived configuration.
//!
//! Every value has a documented default; free-tier rate limits are assumed
//! when no API key is present. Unparseable values fall back to the default
//! with a warning instead of aborting startup.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use log::warn;

use crate::http::{FetchOptions, DEFAULT_RATE_LIMIT_BACKOFF, DEFAULT_RETRIES, DEFAULT_TIMEOUT};
use crate::models::{providers, DatasetKey};

/// Default orchestrator period.
pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_secs(3 * 60);

/// Default pause between dataset refreshes within a cycle.
pub const DEFAULT_DATASET_DELAY: Duration = Duration::from_millis(4_000);

const COINGECKO_PRO_BASE_URL: &str = "https://pro-api.coingecko.com/api/v3";
const COINGECKO_PRO_RATE_LIMIT: u32 = 500;

const DEFAULT_ALTCOINS: &[&str] = &[
    "ethereum",
    "solana",
    "sui",
    "hyperliquid",
    "chainlink",
    "cardano",
    "dogecoin",
    "avalanche-2",
];

const DEFAULT_STOCKS: &[&str] = &["MSTR", "COIN", "HOOD", "TSLA", "NVDA", "MARA"];

const DEFAULT_NFT_COLLECTIONS: &[&str] = &[
    "cryptopunks",
    "boredapeyachtclub",
    "pudgypenguins",
    "fidenza-by-tyler-hobbs",
];

/// Connection settings for one upstream provider. Immutable once built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub rate_limit_per_minute: u32,
}

impl ProviderConfig {
    pub fn new(base_url: impl Into<String>, rate_limit_per_minute: u32) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            rate_limit_per_minute,
        }
    }
}

/// Free-tier defaults: (base url, requests per minute).
fn provider_defaults(provider: &str) -> (&'static str, u32) {
    match provider {
        providers::COINGECKO => ("https://api.coingecko.com/api/v3", 30),
        providers::BLOCKCHAIN => ("https://api.blockchain.info", 60),
        providers::MEMPOOL => ("https://mempool.space/api", 60),
        providers::ALTERNATIVE_ME => ("https://api.alternative.me", 60),
        providers::YAHOO => ("https://query1.finance.yahoo.com", 60),
        providers::FRED => ("https://api.stlouisfed.org/fred", 120),
        providers::GECKOTERMINAL => ("https://api.geckoterminal.com/api/v2", 30),
        providers::OPENSEA => ("https://api.opensea.io/api/v2", 60),
        _ => ("", crate::rate_limiter::DEFAULT_REQUESTS_PER_MINUTE),
    }
}

/// Orchestrator pacing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScheduleConfig {
    pub update_interval: Duration,
    pub dataset_delay: Duration,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            update_interval: DEFAULT_UPDATE_INTERVAL,
            dataset_delay: DEFAULT_DATASET_DELAY,
        }
    }
}

/// Watch lists for the curated datasets.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CuratedLists {
    /// CoinGecko coin ids.
    pub altcoins: Vec<String>,
    /// Equity ticker symbols.
    pub stocks: Vec<String>,
    /// NFT collection slugs.
    pub nft_collections: Vec<String>,
}

impl Default for CuratedLists {
    fn default() -> Self {
        let owned = |items: &[&str]| -> Vec<String> { items.iter().map(|s| s.to_string()).collect() };
        Self {
            altcoins: owned(DEFAULT_ALTCOINS),
            stocks: owned(DEFAULT_STOCKS),
            nft_collections: owned(DEFAULT_NFT_COLLECTIONS),
        }
    }
}

/// Complete configuration for the feed service.
#[derive(Clone, Debug)]
pub struct FeedConfig {
    providers: HashMap<&'static str, ProviderConfig>,
    pub fetch: FetchOptions,
    /// Per-dataset TTL overrides; datasets not listed use their built-in TTL.
    pub ttl_overrides: HashMap<DatasetKey, Duration>,
    pub schedule: ScheduleConfig,
    pub curated: CuratedLists,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl FeedConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let providers = providers::ALL
            .iter()
            .map(|&id| (id, provider_from_lookup(id, &lookup)))
            .collect();

        let fetch = FetchOptions {
            retries: parse_or(&lookup, "PULSE_FETCH_RETRIES", DEFAULT_RETRIES),
            timeout: Duration::from_millis(parse_or(
                &lookup,
                "PULSE_FETCH_TIMEOUT_MS",
                DEFAULT_TIMEOUT.as_millis() as u64,
            )),
            rate_limit_backoff: Duration::from_secs(parse_or(
                &lookup,
                "PULSE_RATE_LIMIT_BACKOFF_SECS",
                DEFAULT_RATE_LIMIT_BACKOFF.as_secs(),
            )),
        };

        let ttl_overrides = DatasetKey::ALL
            .iter()
            .filter_map(|key| {
                let var = format!("PULSE_TTL_{}_SECS", key.env_name());
                lookup(&var)?;
                let secs: u64 = parse_or(&lookup, &var, 0);
                (secs > 0).then(|| (*key, Duration::from_secs(secs)))
            })
            .collect();

        let schedule = ScheduleConfig {
            update_interval: Duration::from_secs(parse_or(
                &lookup,
                "PULSE_UPDATE_INTERVAL_SECS",
                DEFAULT_UPDATE_INTERVAL.as_secs(),
            )),
            dataset_delay: Duration::from_millis(parse_or(
                &lookup,
                "PULSE_DATASET_DELAY_MS",
                DEFAULT_DATASET_DELAY.as_millis() as u64,
            )),
        };

        let defaults = CuratedLists::default();
        let curated = CuratedLists {
            altcoins: list_or(&lookup, "PULSE_ALTCOINS", defaults.altcoins),
            stocks: list_or(&lookup, "PULSE_STOCKS", defaults.stocks),
            nft_collections: list_or(&lookup, "PULSE_NFT_COLLECTIONS", defaults.nft_collections),
        };

        Self {
            providers,
            fetch,
            ttl_overrides,
            schedule,
            curated,
        }
    }

    /// Settings for a provider. Unknown ids get an empty config with the
    /// default rate limit.
    pub fn provider(&self, id: &str) -> ProviderConfig {
        self.providers.get(id).cloned().unwrap_or_else(|| {
            let (base_url, limit) = provider_defaults(id);
            ProviderConfig::new(base_url, limit)
        })
    }

    /// Replace a provider's settings.
    pub fn set_provider(&mut self, id: &'static str, config: ProviderConfig) {
        self.providers.insert(id, config);
    }

    /// Point every provider at the same base URL (local mirrors, tests).
    pub fn with_base_url_for_all(mut self, base_url: &str) -> Self {
        for config in self.providers.values_mut() {
            config.base_url = base_url.to_string();
        }
        self
    }

    /// All configured providers with their settings.
    pub fn providers(&self) -> impl Iterator<Item = (&'static str, &ProviderConfig)> {
        self.providers.iter().map(|(id, config)| (*id, config))
    }
}

fn provider_from_lookup<F>(id: &'static str, lookup: &F) -> ProviderConfig
where
    F: Fn(&str) -> Option<String>,
{
    let (default_url, default_limit) = provider_defaults(id);
    let api_key = lookup(&format!("{id}_API_KEY"));

    // A CoinGecko key unlocks the pro endpoint and its higher limit.
    let (default_url, default_limit) = match (id, &api_key) {
        (providers::COINGECKO, Some(_)) => (COINGECKO_PRO_BASE_URL, COINGECKO_PRO_RATE_LIMIT),
        _ => (default_url, default_limit),
    };

    let base_url = lookup(&format!("{id}_BASE_URL"))
        .map(|url| url.trim_end_matches('/').to_string())
        .unwrap_or_else(|| default_url.to_string());
    let rate_limit_per_minute =
        parse_or(lookup, &format!("{id}_RATE_LIMIT_PER_MINUTE"), default_limit).max(1);

    ProviderConfig {
        base_url,
        api_key,
        rate_limit_per_minute,
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Debug,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("Invalid value '{}' for {}, using default {:?}", raw, key, default);
            default
        }),
    }
}

fn list_or<F>(lookup: &F, key: &str, default: Vec<String>) -> Vec<String>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> FeedConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        FeedConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_assume_free_tiers() {
        let config = FeedConfig::default();

        let coingecko = config.provider(providers::COINGECKO);
        assert_eq!(coingecko.base_url, "https://api.coingecko.com/api/v3");
        assert_eq!(coingecko.rate_limit_per_minute, 30);
        assert_eq!(coingecko.api_key, None);

        assert_eq!(config.fetch, FetchOptions::default());
        assert_eq!(config.schedule.update_interval, Duration::from_secs(180));
        assert_eq!(config.schedule.dataset_delay, Duration::from_secs(4));
        assert!(config.ttl_overrides.is_empty());
        assert_eq!(config.providers().count(), providers::ALL.len());
    }

    #[test]
    fn test_coingecko_key_switches_to_pro() {
        let config = config_from(&[("COINGECKO_API_KEY", "cg-key")]);
        let coingecko = config.provider(providers::COINGECKO);

        assert_eq!(coingecko.base_url, COINGECKO_PRO_BASE_URL);
        assert_eq!(coingecko.rate_limit_per_minute, 500);
        assert_eq!(coingecko.api_key.as_deref(), Some("cg-key"));
    }

    #[test]
    fn test_explicit_provider_settings_win() {
        let config = config_from(&[
            ("MEMPOOL_BASE_URL", "http://localhost:9000/api/"),
            ("MEMPOOL_RATE_LIMIT_PER_MINUTE", "10"),
            ("FRED_API_KEY", "  fred-key "),
        ]);

        let mempool = config.provider(providers::MEMPOOL);
        assert_eq!(mempool.base_url, "http://localhost:9000/api");
        assert_eq!(mempool.rate_limit_per_minute, 10);
        assert_eq!(
            config.provider(providers::FRED).api_key.as_deref(),
            Some("fred-key")
        );
    }

    #[test]
    fn test_invalid_numbers_fall_back() {
        let config = config_from(&[
            ("PULSE_FETCH_RETRIES", "lots"),
            ("PULSE_FETCH_TIMEOUT_MS", "15000"),
            ("YAHOO_RATE_LIMIT_PER_MINUTE", "-5"),
        ]);

        assert_eq!(config.fetch.retries, DEFAULT_RETRIES);
        assert_eq!(config.fetch.timeout, Duration::from_secs(15));
        assert_eq!(config.provider(providers::YAHOO).rate_limit_per_minute, 60);
    }

    #[test]
    fn test_ttl_overrides_and_lists() {
        let config = config_from(&[
            ("PULSE_TTL_TOP100_VS_BTC_SECS", "120"),
            ("PULSE_TTL_DEX_TRENDING_SECS", "zero"),
            ("PULSE_STOCKS", "MSTR, SPY,,"),
            ("PULSE_NFT_COLLECTIONS", ""),
        ]);

        assert_eq!(
            config.ttl_overrides.get(&DatasetKey::Top100VsBtc),
            Some(&Duration::from_secs(120))
        );
        assert!(!config.ttl_overrides.contains_key(&DatasetKey::DexTrending));
        assert_eq!(config.curated.stocks, vec!["MSTR", "SPY"]);
        // Empty values count as unset.
        assert_eq!(
            config.curated.nft_collections,
            CuratedLists::default().nft_collections
        );
    }

    #[test]
    fn test_base_url_for_all() {
        let config = FeedConfig::default().with_base_url_for_all("http://mirror");
        assert!(config.providers().all(|(_, c)| c.base_url == "http://mirror"));
    }
}
