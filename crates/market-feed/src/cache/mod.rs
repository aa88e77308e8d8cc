//! Per-dataset TTL cache.
//!
//! - `policy` - TTL and failure policy per dataset
//! - `store` - Entry map owned by one manager instance
//! - `manager` - Staleness decisions, reads and refreshes

mod manager;
mod policy;
mod store;

pub use manager::{
    CachedDataset, DatasetCache, DatasetStatus, FailureAction, RefreshOutcome,
};
pub use policy::{CachePolicies, DatasetPolicy, FailurePolicy};
pub use store::{CacheEntry, CacheStore, EntryOrigin};

#[cfg(test)]
pub(crate) use manager::testing;
