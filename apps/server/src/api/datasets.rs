use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use pulse_market_feed::{CachedDataset, DatasetKey, DatasetStatus, RefreshOutcome};

use crate::{
    error::{ApiError, ApiResult},
    main_lib::AppState,
};

/// Cache state of every dataset.
async fn list_datasets(State(state): State<Arc<AppState>>) -> Json<Vec<DatasetStatus>> {
    Json(state.cache.status())
}

/// Serve a dataset from the cache. Never triggers a fetch.
async fn get_dataset(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> ApiResult<Json<CachedDataset>> {
    let key: DatasetKey = key.parse()?;
    state
        .cache
        .snapshot(key)
        .map(Json)
        .ok_or(ApiError::Unavailable(key))
}

/// Bypass the TTL and fetch the dataset now.
async fn refresh_dataset(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> ApiResult<Json<CachedDataset>> {
    let key: DatasetKey = key.parse()?;
    if let RefreshOutcome::Failed { error, action } = state.cache.refresh(key).await {
        tracing::warn!(dataset = %key, ?action, "Manual refresh failed: {}", error);
    }
    state
        .cache
        .snapshot(key)
        .map(Json)
        .ok_or(ApiError::Unavailable(key))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/datasets", get(list_datasets))
        .route("/datasets/{key}", get(get_dataset))
        .route("/datasets/{key}/refresh", post(refresh_dataset))
}
