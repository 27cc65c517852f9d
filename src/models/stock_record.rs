use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

use crate::models::PriceBar;

/// The per-day OHLCV object stored in `stock_records.prices`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DailyPrices {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl From<&PriceBar> for DailyPrices {
    fn from(bar: &PriceBar) -> Self {
        Self {
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
        }
    }
}

// One row of `stock_records`, keyed by (ticker, record_date).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StockRecord {
    pub id: i32,
    pub ticker: String,
    pub record_date: NaiveDate,
    pub prices: Json<DailyPrices>,
    pub insights: Option<Json<Vec<String>>>,
    pub created_at: DateTime<Utc>,
}
