use std::sync::Arc;

use chrono::{DateTime, Utc};
use pulse_market_feed::{
    CachePolicies, Clock, DatasetCache, DatasetSource, FeedConfig, MarketClient, SystemClock,
    UpdateOrchestrator,
};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;

pub struct AppState {
    pub cache: Arc<DatasetCache>,
    pub orchestrator: Arc<UpdateOrchestrator>,
    pub started_at: DateTime<Utc>,
}

pub fn init_tracing() {
    let log_format = std::env::var("PULSE_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

pub fn build_state(config: &Config) -> Arc<AppState> {
    for (id, provider) in config.feed.providers() {
        tracing::debug!(
            provider = id,
            base_url = %provider.base_url,
            rate_limit_per_minute = provider.rate_limit_per_minute,
            has_api_key = provider.api_key.is_some(),
            "Provider configured"
        );
    }

    let client = MarketClient::from_config(&config.feed);
    state_with_source(Arc::new(client), &config.feed, Arc::new(SystemClock))
}

/// Assemble the cache and orchestrator around any dataset source.
pub fn state_with_source(
    source: Arc<dyn DatasetSource>,
    feed: &FeedConfig,
    clock: Arc<dyn Clock>,
) -> Arc<AppState> {
    let policies = CachePolicies::with_ttl_overrides(&feed.ttl_overrides);
    let cache = Arc::new(DatasetCache::new(source, policies, clock.clone()));
    let orchestrator = Arc::new(UpdateOrchestrator::new(
        cache.clone(),
        clock.clone(),
        feed.schedule.clone(),
    ));
    let started_at = DateTime::from_timestamp_millis(clock.now_millis()).unwrap_or_else(Utc::now);

    Arc::new(AppState {
        cache,
        orchestrator,
        started_at,
    })
}
