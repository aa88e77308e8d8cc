//! Dataset source trait definitions.

use async_trait::async_trait;

use crate::errors::FeedError;
use crate::models::{DatasetKey, DatasetValue};

/// Anything that can produce a fresh value for a dataset.
///
/// `MarketClient` is the production implementation; the cache manager and
/// orchestrator only see this trait, so tests can script dataset outcomes
/// without going through HTTP.
///
/// # Example
///
/// ```ignore
/// use async_trait::async_trait;
/// use pulse_market_feed::provider::DatasetSource;
///
/// struct Fixed(DatasetValue);
///
/// #[async_trait]
/// impl DatasetSource for Fixed {
///     async fn fetch_dataset(&self, _key: DatasetKey) -> Result<DatasetValue, FeedError> {
///         Ok(self.0.clone())
///     }
/// }
/// ```
#[async_trait]
pub trait DatasetSource: Send + Sync {
    /// Fetch `key` from upstream.
    ///
    /// Implementations apply their own per-section fallbacks; an `Err` means
    /// the dataset as a whole could not be produced.
    async fn fetch_dataset(&self, key: DatasetKey) -> Result<DatasetValue, FeedError>;
}
