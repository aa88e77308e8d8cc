//! Pulse Market Feed Crate
//!
//! This crate acquires market data from third-party APIs and keeps it in
//! per-dataset TTL caches for frequent, non-blocking reads.
//!
//! # Overview
//!
//! The market feed crate provides:
//! - A per-provider sliding-window rate limiter
//! - A resilient fetch wrapper (timeout, retry, exponential backoff, `Retry-After`)
//! - Typed provider clients mapping upstream JSON into normalized records
//! - A dataset cache with explicit per-dataset failure policies
//! - An orchestrator that refreshes every dataset on a fixed period
//!
//! # Architecture
//!
//! ```text
//! +------------------+     +------------------+
//! |  Read callers    | --> |  DatasetCache    |  (get / snapshot / force_refresh)
//! +------------------+     +------------------+
//!                                  ^
//!                                  |
//!                          +------------------+
//!                          |   Orchestrator   |  (fixed order, paced)
//!                          +------------------+
//!                                  |
//!                                  v
//!                          +------------------+
//!                          |  MarketClient    |  (DatasetSource)
//!                          +------------------+
//!                                  |
//!                                  v
//!                         +-------------------+
//!                         |  RateLimiter  +   |
//!                         |  ResilientFetcher |
//!                         +-------------------+
//!                                  |
//!                                  v
//!                          +------------------+
//!                          |  HttpTransport   |  (reqwest)
//!                          +------------------+
//! ```
//!
//! # Core Types
//!
//! - [`DatasetKey`] - Identifier of one independently cached feed
//! - [`DatasetValue`] - Normalized record for any dataset
//! - [`DatasetCache`] - Owns one entry per dataset and mediates reads
//! - [`UpdateOrchestrator`] - Periodic refresh driver
//! - [`Clock`] - Injected time source for every suspension point

pub mod cache;
pub mod clock;
pub mod config;
pub mod errors;
pub mod http;
pub mod models;
pub mod orchestrator;
pub mod provider;
pub mod rate_limiter;

// Re-export commonly used types
pub use cache::{
    CachePolicies, CachedDataset, DatasetCache, DatasetStatus, FailurePolicy, RefreshOutcome,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CuratedLists, FeedConfig, ProviderConfig, ScheduleConfig};
pub use errors::{FeedError, RetryClass};
pub use models::{providers, DatasetKey, DatasetValue};
pub use orchestrator::{CycleReport, OrchestratorHandle, UpdateOrchestrator};
pub use provider::{DatasetSource, MarketClient};
pub use rate_limiter::RateLimiter;
