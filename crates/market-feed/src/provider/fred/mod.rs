//! FRED (St. Louis Fed) provider for macro series.
//!
//! The single-series readers degrade to a fixed fallback reading. The
//! dataset path, `macro_indicators`, fails instead so the cache decides
//! between the last good entry and the fallback.

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, warn};

use super::upstream::Upstream;
use crate::errors::FeedError;
use crate::models::defaults::{DOLLAR_INDEX_FALLBACK, TREASURY_10Y_FALLBACK};
use crate::models::{MacroIndicators, MacroReading};

/// Nominal broad U.S. dollar index (daily).
pub const DOLLAR_INDEX_SERIES: &str = "DTWEXBGS";

/// 10-year treasury constant maturity rate (daily, percent).
pub const TREASURY_10Y_SERIES: &str = "DGS10";

/// Recent observations requested per series; holidays report ".".
const OBSERVATION_LIMIT: &str = "10";

/// FRED's marker for a missing observation.
const MISSING_VALUE: &str = ".";

/// Response from /series/observations
#[derive(Debug, Deserialize)]
struct ObservationsResponse {
    #[serde(default)]
    observations: Vec<Observation>,
}

#[derive(Debug, Deserialize)]
struct Observation {
    date: Option<String>,
    value: Option<String>,
}

pub struct FredProvider {
    upstream: Upstream,
}

impl FredProvider {
    pub fn new(upstream: Upstream) -> Self {
        Self { upstream }
    }

    pub async fn dollar_index(&self) -> MacroReading {
        self.reading_or_fallback(DOLLAR_INDEX_SERIES, DOLLAR_INDEX_FALLBACK)
            .await
    }

    pub async fn treasury_yield_10y(&self) -> MacroReading {
        self.reading_or_fallback(TREASURY_10Y_SERIES, TREASURY_10Y_FALLBACK)
            .await
    }

    /// Both series from upstream. Fails if either one is unavailable,
    /// including when no API key is configured.
    pub async fn macro_indicators(&self) -> Result<MacroIndicators, FeedError> {
        let (dollar_index, treasury_10y_yield) = tokio::join!(
            self.latest_observation(DOLLAR_INDEX_SERIES),
            self.latest_observation(TREASURY_10Y_SERIES)
        );
        Ok(MacroIndicators {
            dollar_index: dollar_index?,
            treasury_10y_yield: treasury_10y_yield?,
        })
    }

    /// Most recent non-missing observation of `series_id`.
    pub async fn latest_observation(&self, series_id: &str) -> Result<MacroReading, FeedError> {
        self.upstream.require_api_key()?;
        let request = self
            .upstream
            .request("/series/observations")
            .query("series_id", series_id)
            .query("file_type", "json")
            .query("sort_order", "desc")
            .query("limit", OBSERVATION_LIMIT);

        let response: ObservationsResponse = self.upstream.get_json(request).await?;
        latest_reading(response, self.upstream.id())
    }

    async fn reading_or_fallback(&self, series_id: &str, fallback: f64) -> MacroReading {
        if !self.upstream.has_api_key() {
            debug!(series_id, "No FRED API key configured, using fallback {}", fallback);
            return MacroReading::fallback(fallback);
        }

        match self.latest_observation(series_id).await {
            Ok(reading) => reading,
            Err(e) => {
                warn!(
                    provider = self.upstream.id(),
                    series_id, "Using fallback {}: {}", fallback, e
                );
                MacroReading::fallback(fallback)
            }
        }
    }
}

fn latest_reading(response: ObservationsResponse, provider: &str) -> Result<MacroReading, FeedError> {
    response
        .observations
        .into_iter()
        .find_map(|obs| {
            let value = obs.value?;
            if value == MISSING_VALUE {
                return None;
            }
            let value = value.trim().parse::<f64>().ok()?;
            let as_of = obs
                .date
                .and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok());
            Some(MacroReading::upstream(value, as_of))
        })
        .ok_or_else(|| FeedError::missing_field(provider, "observations[].value"))
}
