use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::external::price_provider::PriceProviderError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Db(sqlx::Error),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Market data error: {0}")]
    PriceProvider(#[from] PriceProviderError),
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),
}

/// Failures of the language-model completion call.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("network error: {0}")]
    NetworkError(String),
    #[error("request timed out")]
    Timeout,
    #[error("unauthorized: check OPENAI_API_KEY")]
    Unauthorized,
    #[error("rate limited")]
    RateLimited,
    #[error("API error: {0}")]
    ApiError(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

fn error_body(status: StatusCode, message: &str) -> axum::response::Response {
    (status, Json(json!({ "error": message }))).into_response()
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        match self {
            AppError::Validation(msg) => error_body(StatusCode::BAD_REQUEST, &msg),
            AppError::PriceProvider(PriceProviderError::RateLimited)
            | AppError::Llm(LlmError::RateLimited) => {
                let mut headers = HeaderMap::new();
                headers.insert("Retry-After", HeaderValue::from_static("60"));
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    headers,
                    Json(json!({ "error": "Rate limited" })),
                )
                    .into_response()
            }
            AppError::PriceProvider(e) => error_body(StatusCode::BAD_GATEWAY, &e.to_string()),
            AppError::Llm(e) => error_body(StatusCode::BAD_GATEWAY, &e.to_string()),
            AppError::Db(_) => error_body(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch stock records"),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(value: sqlx::Error) -> Self {
        AppError::Db(value)
    }
}
