use async_trait::async_trait;
use thiserror::Error;

use crate::models::PriceBar;

#[derive(Debug, Error)]
pub enum PriceProviderError {
    #[error("network error: {0}")]
    Network(String),

    #[error("bad response: {0}")]
    BadResponse(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("rate limited")]
    RateLimited,

    #[error("ticker not found")]
    NotFound,
}

#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// Daily OHLCV bars for the trailing `days` calendar days, oldest first.
    async fn fetch_daily_bars(
        &self,
        ticker: &str,
        days: u32,
    ) -> Result<Vec<PriceBar>, PriceProviderError>;
}
