//! Dataset cache manager: staleness, reads and refreshes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

use super::policy::{CachePolicies, FailurePolicy};
use super::store::{CacheEntry, CacheStore, EntryOrigin};
use crate::clock::Clock;
use crate::errors::FeedError;
use crate::models::defaults::fallback_value;
use crate::models::{DatasetKey, DatasetValue};
use crate::provider::DatasetSource;

/// What happened to the cached entry after a failed refresh.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureAction {
    /// Previous entry retained and still served.
    KeptStale,
    /// Fallback record seeded because nothing was cached yet.
    SeededFallback,
    /// Previous entry dropped; readers get nothing until the next success.
    Evicted,
    /// Nothing was cached before and nothing is now.
    NothingCached,
}

/// Result of one refresh attempt.
#[derive(Clone, Debug)]
pub enum RefreshOutcome {
    /// Entry was still within its TTL; nothing fetched.
    Fresh,
    Refreshed,
    Failed {
        error: FeedError,
        action: FailureAction,
    },
}

impl RefreshOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// A served dataset with its staleness metadata.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedDataset {
    pub key: DatasetKey,
    pub data: Arc<DatasetValue>,
    pub fetched_at: DateTime<Utc>,
    #[serde(rename = "ageSeconds", serialize_with = "as_secs")]
    pub age: Duration,
    pub is_stale: bool,
    pub is_fallback: bool,
}

/// Cache state of one dataset, for status listings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetStatus {
    pub key: DatasetKey,
    pub cached: bool,
    pub valid: bool,
    pub is_fallback: bool,
    pub age_seconds: Option<u64>,
    pub ttl_seconds: u64,
    pub policy: FailurePolicy,
}

fn as_secs<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_secs())
}

/// Owns one entry per dataset key and mediates every read.
///
/// Reads never touch the network. Only `refresh_if_stale` and
/// `force_refresh` call the dataset source, and refreshes of the same key
/// are serialized by a per-key gate.
pub struct DatasetCache {
    store: CacheStore,
    policies: CachePolicies,
    source: Arc<dyn DatasetSource>,
    clock: Arc<dyn Clock>,
    gates: Mutex<HashMap<DatasetKey, Arc<AsyncMutex<()>>>>,
}

impl DatasetCache {
    pub fn new(source: Arc<dyn DatasetSource>, policies: CachePolicies, clock: Arc<dyn Clock>) -> Self {
        Self {
            store: CacheStore::new(),
            policies,
            source,
            clock,
            gates: Mutex::new(HashMap::new()),
        }
    }

    fn age_millis(&self, entry: &CacheEntry) -> i64 {
        (self.clock.now_millis() - entry.timestamp).max(0)
    }

    fn is_entry_valid(&self, key: DatasetKey, entry: &CacheEntry) -> bool {
        entry.origin == EntryOrigin::Upstream
            && (self.age_millis(entry) as u128) < self.policies.ttl(key).as_millis()
    }

    /// True iff an upstream entry exists and is younger than the TTL.
    ///
    /// A seeded fallback entry is never valid, so the next cycle retries it.
    pub fn is_valid(&self, key: DatasetKey) -> bool {
        self.store
            .get(key)
            .is_some_and(|entry| self.is_entry_valid(key, &entry))
    }

    /// Entry visible to readers under the dataset's failure policy.
    fn visible(&self, key: DatasetKey) -> Option<(CacheEntry, bool)> {
        let entry = self.store.get(key)?;
        let valid = self.is_entry_valid(key, &entry);
        if !valid && self.policies.get(key).on_failure == FailurePolicy::NullOnFailure {
            return None;
        }
        Some((entry, valid))
    }

    /// Cached data, without fetching.
    ///
    /// Fresh data is always returned. Past its TTL, stale data is still
    /// served unless the dataset is `NullOnFailure`.
    pub fn get(&self, key: DatasetKey) -> Option<Arc<DatasetValue>> {
        self.visible(key).map(|(entry, _)| entry.data)
    }

    /// Like `get`, with age and staleness flags.
    pub fn snapshot(&self, key: DatasetKey) -> Option<CachedDataset> {
        let (entry, valid) = self.visible(key)?;
        let age = Duration::from_millis(self.age_millis(&entry) as u64);
        Some(CachedDataset {
            key,
            fetched_at: DateTime::from_timestamp_millis(entry.timestamp).unwrap_or_default(),
            age,
            is_stale: !valid,
            is_fallback: entry.origin == EntryOrigin::Fallback,
            data: entry.data,
        })
    }

    pub fn status(&self) -> Vec<DatasetStatus> {
        DatasetKey::ALL
            .iter()
            .map(|&key| {
                let policy = self.policies.get(key);
                let entry = self.store.get(key);
                DatasetStatus {
                    key,
                    cached: entry.is_some(),
                    valid: entry
                        .as_ref()
                        .is_some_and(|e| self.is_entry_valid(key, e)),
                    is_fallback: entry
                        .as_ref()
                        .is_some_and(|e| e.origin == EntryOrigin::Fallback),
                    age_seconds: entry
                        .as_ref()
                        .map(|e| (self.age_millis(e) / 1000) as u64),
                    ttl_seconds: policy.ttl.as_secs(),
                    policy: policy.on_failure,
                }
            })
            .collect()
    }

    fn gate(&self, key: DatasetKey) -> Arc<AsyncMutex<()>> {
        let mut gates = self.gates.lock().unwrap_or_else(|poisoned| {
            log::warn!("Refresh gate map was poisoned. Recovering...");
            poisoned.into_inner()
        });
        gates.entry(key).or_default().clone()
    }

    /// Fetch `key` only when it is not valid.
    ///
    /// If another refresh of the same key completes while this one waits on
    /// the gate, the fresh entry is kept and nothing is fetched.
    pub async fn refresh_if_stale(&self, key: DatasetKey) -> RefreshOutcome {
        if self.is_valid(key) {
            debug!(dataset = key.as_str(), "Still fresh, skipping");
            return RefreshOutcome::Fresh;
        }

        let gate = self.gate(key);
        let _guard = gate.lock().await;
        if self.is_valid(key) {
            debug!(dataset = key.as_str(), "Refreshed while waiting, skipping");
            return RefreshOutcome::Fresh;
        }

        self.fetch_and_store(key).await
    }

    /// Fetch `key` regardless of staleness.
    ///
    /// Returns the new value, or `None` on failure. When a refresh of the
    /// same key lands while this call waits on the gate, its value is
    /// returned without another upstream call.
    pub async fn force_refresh(&self, key: DatasetKey) -> Option<Arc<DatasetValue>> {
        match self.refresh(key).await {
            RefreshOutcome::Refreshed => self
                .store
                .get(key)
                .filter(|e| e.origin == EntryOrigin::Upstream)
                .map(|e| e.data),
            _ => None,
        }
    }

    /// Unconditional refresh, reporting what happened.
    pub async fn refresh(&self, key: DatasetKey) -> RefreshOutcome {
        let seen = self.store.generation(key);
        let gate = self.gate(key);
        let _guard = gate.lock().await;

        if self.store.generation(key) != seen {
            let joined = self
                .store
                .get(key)
                .is_some_and(|e| e.origin == EntryOrigin::Upstream);
            if joined {
                debug!(dataset = key.as_str(), "Joined a concurrent refresh");
                return RefreshOutcome::Refreshed;
            }
        }

        self.fetch_and_store(key).await
    }

    async fn fetch_and_store(&self, key: DatasetKey) -> RefreshOutcome {
        let result = self.source.fetch_dataset(key).await.and_then(|value| {
            if value.key() == key {
                Ok(value)
            } else {
                Err(FeedError::UnknownDataset(format!(
                    "{} returned for {}",
                    value.key(),
                    key
                )))
            }
        });

        match result {
            Ok(value) => {
                let entry = self.store.put(
                    key,
                    Arc::new(value),
                    self.clock.now_millis(),
                    EntryOrigin::Upstream,
                );
                info!(
                    dataset = key.as_str(),
                    generation = entry.generation,
                    "Dataset refreshed"
                );
                RefreshOutcome::Refreshed
            }
            Err(error) => {
                let action = self.apply_failure_policy(key);
                warn!(
                    dataset = key.as_str(),
                    action = ?action,
                    "Refresh failed: {}",
                    error
                );
                RefreshOutcome::Failed { error, action }
            }
        }
    }

    fn apply_failure_policy(&self, key: DatasetKey) -> FailureAction {
        match self.policies.get(key).on_failure {
            FailurePolicy::StaleOk => {
                if self.store.contains(key) {
                    FailureAction::KeptStale
                } else {
                    FailureAction::NothingCached
                }
            }
            FailurePolicy::DefaultOk => {
                if self.store.contains(key) {
                    return FailureAction::KeptStale;
                }
                match fallback_value(key) {
                    Some(fallback) => {
                        self.store.put(
                            key,
                            Arc::new(fallback),
                            self.clock.now_millis(),
                            EntryOrigin::Fallback,
                        );
                        FailureAction::SeededFallback
                    }
                    None => FailureAction::NothingCached,
                }
            }
            FailurePolicy::NullOnFailure => match self.store.evict(key) {
                Some(_) => FailureAction::Evicted,
                None => FailureAction::NothingCached,
            },
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::clock::ManualClock;
    use crate::models::defaults::DOLLAR_INDEX_FALLBACK;
    use rust_decimal_macros::dec;

    fn cache(source: Arc<ScriptedSource>) -> (DatasetCache, Arc<ManualClock>) {
        let clock = ManualClock::new(1_000_000);
        let cache = DatasetCache::new(source, CachePolicies::default(), clock.clone());
        (cache, clock)
    }

    fn top100_marker(value: &DatasetValue) -> f64 {
        match value {
            DatasetValue::Top100VsBtc(v) => v.btc_change_24h_pct,
            other => panic!("unexpected dataset {}", other.key()),
        }
    }

    #[tokio::test]
    async fn test_cold_start_returns_none() {
        let (cache, _) = cache(Arc::new(ScriptedSource::new()));

        assert!(!cache.is_valid(DatasetKey::BitcoinNetwork));
        assert!(cache.get(DatasetKey::BitcoinNetwork).is_none());
        assert!(cache.snapshot(DatasetKey::BitcoinNetwork).is_none());
    }

    #[tokio::test]
    async fn test_ttl_boundary() {
        let source = Arc::new(ScriptedSource::new());
        source.push(DatasetKey::CuratedAltcoins, Ok(value(DatasetKey::CuratedAltcoins, 1)));
        let (cache, clock) = cache(source.clone());

        let outcome = cache.refresh_if_stale(DatasetKey::CuratedAltcoins).await;
        assert!(matches!(outcome, RefreshOutcome::Refreshed));

        clock.advance(Duration::from_millis(59_999));
        assert!(cache.is_valid(DatasetKey::CuratedAltcoins));
        assert!(matches!(
            cache.refresh_if_stale(DatasetKey::CuratedAltcoins).await,
            RefreshOutcome::Fresh
        ));
        assert_eq!(source.count(DatasetKey::CuratedAltcoins), 1);

        clock.advance(Duration::from_millis(1));
        assert!(!cache.is_valid(DatasetKey::CuratedAltcoins));
        cache.refresh_if_stale(DatasetKey::CuratedAltcoins).await;
        assert_eq!(source.count(DatasetKey::CuratedAltcoins), 2);
    }

    #[tokio::test]
    async fn test_stale_ok_serves_previous_value_after_failure() {
        let source = Arc::new(ScriptedSource::new());
        source
            .push(DatasetKey::BitcoinNetwork, Ok(value(DatasetKey::BitcoinNetwork, 42)))
            .push(DatasetKey::BitcoinNetwork, Err(upstream_down()));
        let (cache, clock) = cache(source);

        cache.refresh_if_stale(DatasetKey::BitcoinNetwork).await;
        clock.advance(Duration::from_secs(301));

        let outcome = cache.refresh_if_stale(DatasetKey::BitcoinNetwork).await;
        assert!(matches!(
            outcome,
            RefreshOutcome::Failed {
                action: FailureAction::KeptStale,
                ..
            }
        ));

        let served = cache.get(DatasetKey::BitcoinNetwork).unwrap();
        assert_eq!(served.as_bitcoin_network().unwrap().price(), dec!(42));
        let snapshot = cache.snapshot(DatasetKey::BitcoinNetwork).unwrap();
        assert!(snapshot.is_stale);
        assert_eq!(snapshot.age, Duration::from_secs(301));
    }

    #[tokio::test]
    async fn test_null_on_failure_evicts() {
        let source = Arc::new(ScriptedSource::new());
        source
            .push(DatasetKey::Top100VsBtc, Ok(value(DatasetKey::Top100VsBtc, 3)))
            .push(DatasetKey::Top100VsBtc, Err(upstream_down()));
        let (cache, clock) = cache(source);

        cache.refresh_if_stale(DatasetKey::Top100VsBtc).await;
        assert_eq!(top100_marker(&cache.get(DatasetKey::Top100VsBtc).unwrap()), 3.0);

        clock.advance(Duration::from_secs(600));
        // Past TTL, nothing is served even before the refresh fails.
        assert!(cache.get(DatasetKey::Top100VsBtc).is_none());

        let outcome = cache.refresh_if_stale(DatasetKey::Top100VsBtc).await;
        assert!(matches!(
            outcome,
            RefreshOutcome::Failed {
                action: FailureAction::Evicted,
                ..
            }
        ));
        assert!(cache.get(DatasetKey::Top100VsBtc).is_none());
        assert!(!cache.status().iter().any(|s| s.key == DatasetKey::Top100VsBtc && s.cached));
    }

    #[tokio::test]
    async fn test_default_ok_seeds_fallback_once() {
        let source = Arc::new(ScriptedSource::new());
        source.push(DatasetKey::MacroIndicators, Err(upstream_down()));
        let (cache, _) = cache(source.clone());

        let outcome = cache.refresh_if_stale(DatasetKey::MacroIndicators).await;
        assert!(matches!(
            outcome,
            RefreshOutcome::Failed {
                action: FailureAction::SeededFallback,
                ..
            }
        ));

        let snapshot = cache.snapshot(DatasetKey::MacroIndicators).unwrap();
        assert!(snapshot.is_fallback);
        assert!(snapshot.is_stale);
        match snapshot.data.as_ref() {
            DatasetValue::MacroIndicators(m) => assert_eq!(m.dollar_index.value, DOLLAR_INDEX_FALLBACK),
            other => panic!("unexpected dataset {}", other.key()),
        }

        // The fallback is never fresh, so the next refresh calls upstream again.
        assert!(!cache.is_valid(DatasetKey::MacroIndicators));
        let outcome = cache.refresh_if_stale(DatasetKey::MacroIndicators).await;
        assert!(matches!(
            outcome,
            RefreshOutcome::Failed {
                action: FailureAction::KeptStale,
                ..
            }
        ));
        assert_eq!(source.count(DatasetKey::MacroIndicators), 2);
    }

    #[tokio::test]
    async fn test_stale_ok_without_data_stays_empty() {
        let (cache, _) = cache(Arc::new(ScriptedSource::new()));

        let outcome = cache.refresh_if_stale(DatasetKey::DexTrending).await;

        assert!(matches!(
            outcome,
            RefreshOutcome::Failed {
                action: FailureAction::NothingCached,
                ..
            }
        ));
        assert!(cache.get(DatasetKey::DexTrending).is_none());
    }

    #[tokio::test]
    async fn test_force_refresh_bypasses_staleness() {
        let source = Arc::new(ScriptedSource::new());
        source
            .push(DatasetKey::Top100VsBtc, Ok(value(DatasetKey::Top100VsBtc, 1)))
            .push(DatasetKey::Top100VsBtc, Ok(value(DatasetKey::Top100VsBtc, 2)));
        let (cache, _) = cache(source.clone());

        cache.refresh_if_stale(DatasetKey::Top100VsBtc).await;
        assert!(cache.is_valid(DatasetKey::Top100VsBtc));

        let forced = cache.force_refresh(DatasetKey::Top100VsBtc).await.unwrap();

        assert_eq!(source.count(DatasetKey::Top100VsBtc), 2);
        assert_eq!(top100_marker(&forced), 2.0);
        assert_eq!(top100_marker(&cache.get(DatasetKey::Top100VsBtc).unwrap()), 2.0);
    }

    #[tokio::test]
    async fn test_force_refresh_failure_returns_none() {
        let source = Arc::new(ScriptedSource::new());
        source
            .push(DatasetKey::TopMovers, Ok(value(DatasetKey::TopMovers, 1)))
            .push(DatasetKey::TopMovers, Err(upstream_down()));
        let (cache, _) = cache(source);

        assert!(cache.force_refresh(DatasetKey::TopMovers).await.is_some());
        assert!(cache.force_refresh(DatasetKey::TopMovers).await.is_none());
        // StaleOk keeps the earlier value.
        assert!(cache.get(DatasetKey::TopMovers).is_some());
    }

    #[tokio::test]
    async fn test_concurrent_refreshes_collapse() {
        let source = Arc::new(
            ScriptedSource::new().with_delay(Duration::from_millis(20)),
        );
        source.push(DatasetKey::TrendingCoins, Ok(value(DatasetKey::TrendingCoins, 1)));
        let (cache, _) = cache(source.clone());

        let (forced, scheduled, forced_again) = tokio::join!(
            cache.force_refresh(DatasetKey::TrendingCoins),
            cache.refresh_if_stale(DatasetKey::TrendingCoins),
            cache.force_refresh(DatasetKey::TrendingCoins),
        );

        assert!(forced.is_some());
        assert!(matches!(scheduled, RefreshOutcome::Fresh));
        assert!(forced_again.is_some());
        assert_eq!(source.count(DatasetKey::TrendingCoins), 1);
    }

    #[tokio::test]
    async fn test_mismatched_value_is_rejected() {
        let source = Arc::new(ScriptedSource::new());
        source.push(DatasetKey::DexTrending, Ok(value(DatasetKey::TrendingCoins, 1)));
        let (cache, _) = cache(source);

        let outcome = cache.refresh_if_stale(DatasetKey::DexTrending).await;

        assert!(outcome.is_failure());
        assert!(cache.get(DatasetKey::DexTrending).is_none());
    }

    #[tokio::test]
    async fn test_status_lists_every_dataset() {
        let source = Arc::new(ScriptedSource::new());
        source.push(DatasetKey::CuratedStocks, Ok(value(DatasetKey::CuratedStocks, 1)));
        let (cache, clock) = cache(source);

        cache.refresh_if_stale(DatasetKey::CuratedStocks).await;
        clock.advance(Duration::from_secs(12));

        let status = cache.status();
        assert_eq!(status.len(), DatasetKey::ALL.len());
        let stocks = status
            .iter()
            .find(|s| s.key == DatasetKey::CuratedStocks)
            .unwrap();
        assert!(stocks.cached && stocks.valid);
        assert_eq!(stocks.age_seconds, Some(12));
        assert_eq!(stocks.ttl_seconds, 300);
        assert!(status.iter().filter(|s| s.cached).count() == 1);
    }
}
