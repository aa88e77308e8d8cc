//! In-memory entry store owned by one cache manager.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::{debug, warn};

use crate::models::{DatasetKey, DatasetValue};

/// Where an entry's data came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryOrigin {
    Upstream,
    /// Documented fallback record seeded after a failed first fetch.
    Fallback,
}

/// One cached dataset. Replaced wholesale on every write, never mutated.
#[derive(Clone, Debug)]
pub struct CacheEntry {
    pub data: Arc<DatasetValue>,
    /// Milliseconds since the epoch at which the data was stored.
    pub timestamp: i64,
    /// Increases with every write to the store.
    pub generation: u64,
    pub origin: EntryOrigin,
}

#[derive(Default)]
struct Entries {
    by_key: HashMap<DatasetKey, CacheEntry>,
    next_generation: u64,
}

/// Entry map for every dataset key.
///
/// Reads clone the entry (an `Arc` bump), so readers never hold the lock
/// across an await.
#[derive(Default)]
pub struct CacheStore {
    entries: RwLock<Entries>,
}

impl CacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Entries> {
        self.entries.read().unwrap_or_else(|poisoned| {
            warn!("Cache store lock was poisoned. Recovering...");
            poisoned.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, Entries> {
        self.entries.write().unwrap_or_else(|poisoned| {
            warn!("Cache store lock was poisoned. Recovering...");
            poisoned.into_inner()
        })
    }

    pub fn get(&self, key: DatasetKey) -> Option<CacheEntry> {
        self.read().by_key.get(&key).cloned()
    }

    pub fn contains(&self, key: DatasetKey) -> bool {
        self.read().by_key.contains_key(&key)
    }

    /// Generation of the current entry, 0 when there is none.
    pub fn generation(&self, key: DatasetKey) -> u64 {
        self.read()
            .by_key
            .get(&key)
            .map(|e| e.generation)
            .unwrap_or(0)
    }

    /// Replace the entry for `key`.
    pub fn put(
        &self,
        key: DatasetKey,
        data: Arc<DatasetValue>,
        timestamp: i64,
        origin: EntryOrigin,
    ) -> CacheEntry {
        let mut entries = self.write();
        entries.next_generation += 1;
        let entry = CacheEntry {
            data,
            timestamp,
            generation: entries.next_generation,
            origin,
        };
        entries.by_key.insert(key, entry.clone());
        debug!(
            "Stored {} (generation {}, {:?})",
            key, entry.generation, origin
        );
        entry
    }

    pub fn evict(&self, key: DatasetKey) -> Option<CacheEntry> {
        let removed = self.write().by_key.remove(&key);
        if removed.is_some() {
            debug!("Evicted {}", key);
        }
        removed
    }
}
