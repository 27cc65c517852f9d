use tracing::{error, info, warn};

use crate::errors::AppError;
use crate::external::price_provider::{PriceProvider, PriceProviderError};
use crate::models::PriceSeries;

/// Trailing window, in calendar days, requested on every run.
pub const HISTORY_DAYS: u32 = 5;

/// Trims and upper-cases a user-supplied symbol.
pub fn normalize_ticker(raw: &str) -> Result<String, AppError> {
    let ticker = raw.trim().to_uppercase();
    if ticker.is_empty() {
        return Err(AppError::Validation("Ticker must not be empty".to_string()));
    }
    if ticker.chars().any(char::is_whitespace) {
        return Err(AppError::Validation(format!("Invalid ticker '{}'", ticker)));
    }
    Ok(ticker)
}

/// Fetches the trailing window of daily bars. Provider errors are not retried.
pub async fn fetch_recent(
    provider: &dyn PriceProvider,
    ticker: &str,
) -> Result<PriceSeries, AppError> {
    let bars = provider
        .fetch_daily_bars(ticker, HISTORY_DAYS)
        .await
        .map_err(|e| {
            match &e {
                PriceProviderError::RateLimited => warn!("Rate limited fetching prices for {}", ticker),
                _ => error!("Failed to fetch prices for {}: {}", ticker, e),
            }
            AppError::PriceProvider(e)
        })?;

    info!("✓ Fetched {} daily bars for {}", bars.len(), ticker);
    Ok(PriceSeries::new(ticker, bars))
}
