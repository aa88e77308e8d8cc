//! Per-dataset TTL and failure policy table.

use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;

use crate::models::DatasetKey;

/// What readers see once a refresh has failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailurePolicy {
    /// Keep the previous entry and keep serving it past its TTL.
    StaleOk,
    /// Like `StaleOk`, and seed the dataset's documented fallback record
    /// when nothing was ever cached.
    DefaultOk,
    /// Drop the entry on failure; never serve it past its TTL.
    NullOnFailure,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DatasetPolicy {
    pub ttl: Duration,
    pub on_failure: FailurePolicy,
}

impl DatasetPolicy {
    const fn new(ttl_secs: u64, on_failure: FailurePolicy) -> Self {
        Self {
            ttl: Duration::from_secs(ttl_secs),
            on_failure,
        }
    }

    /// Built-in policy for a dataset.
    pub const fn default_for(key: DatasetKey) -> Self {
        use FailurePolicy::*;
        match key {
            DatasetKey::BitcoinNetwork => Self::new(300, StaleOk),
            DatasetKey::CuratedAltcoins => Self::new(60, StaleOk),
            DatasetKey::Top100VsBtc => Self::new(600, NullOnFailure),
            DatasetKey::DexTrending => Self::new(300, StaleOk),
            DatasetKey::TopMovers => Self::new(300, StaleOk),
            DatasetKey::TrendingCoins => Self::new(300, StaleOk),
            DatasetKey::CuratedNfts => Self::new(60, NullOnFailure),
            DatasetKey::CuratedStocks => Self::new(300, StaleOk),
            DatasetKey::MacroIndicators => Self::new(3600, DefaultOk),
        }
    }
}

/// Policy for every dataset, with configured TTL overrides applied.
#[derive(Clone, Debug)]
pub struct CachePolicies {
    policies: HashMap<DatasetKey, DatasetPolicy>,
}

impl Default for CachePolicies {
    fn default() -> Self {
        Self::with_ttl_overrides(&HashMap::new())
    }
}

impl CachePolicies {
    pub fn with_ttl_overrides(overrides: &HashMap<DatasetKey, Duration>) -> Self {
        let policies = DatasetKey::ALL
            .iter()
            .map(|&key| {
                let mut policy = DatasetPolicy::default_for(key);
                if let Some(ttl) = overrides.get(&key) {
                    policy.ttl = *ttl;
                }
                (key, policy)
            })
            .collect();
        Self { policies }
    }

    pub fn get(&self, key: DatasetKey) -> DatasetPolicy {
        self.policies
            .get(&key)
            .copied()
            .unwrap_or_else(|| DatasetPolicy::default_for(key))
    }

    pub fn ttl(&self, key: DatasetKey) -> Duration {
        self.get(key).ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table() {
        let policies = CachePolicies::default();

        assert_eq!(policies.ttl(DatasetKey::CuratedAltcoins), Duration::from_secs(60));
        assert_eq!(policies.ttl(DatasetKey::TrendingCoins), Duration::from_secs(300));
        assert_eq!(policies.ttl(DatasetKey::Top100VsBtc), Duration::from_secs(600));
        assert_eq!(policies.ttl(DatasetKey::CuratedNfts), Duration::from_secs(60));
        assert_eq!(
            policies.get(DatasetKey::CuratedNfts).on_failure,
            FailurePolicy::NullOnFailure
        );
        assert_eq!(
            policies.get(DatasetKey::MacroIndicators).on_failure,
            FailurePolicy::DefaultOk
        );
    }

    #[test]
    fn test_ttl_override_keeps_failure_policy() {
        let overrides = HashMap::from([(DatasetKey::Top100VsBtc, Duration::from_secs(30))]);
        let policies = CachePolicies::with_ttl_overrides(&overrides);

        let policy = policies.get(DatasetKey::Top100VsBtc);
        assert_eq!(policy.ttl, Duration::from_secs(30));
        assert_eq!(policy.on_failure, FailurePolicy::NullOnFailure);
        assert_eq!(policies.ttl(DatasetKey::TopMovers), Duration::from_secs(300));
    }
}
