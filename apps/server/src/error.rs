use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use pulse_market_feed::{DatasetKey, FeedError};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Feed(#[from] FeedError),
    #[error("{0} data is temporarily unavailable")]
    Unavailable(DatasetKey),
}

#[derive(Serialize)]
struct ErrorBody {
    code: u16,
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Feed(FeedError::UnknownDataset(_)) => StatusCode::NOT_FOUND,
            ApiError::Feed(_) => StatusCode::BAD_GATEWAY,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        let body = Json(ErrorBody {
            code: status.as_u16(),
            error: self.to_string(),
        });
        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
