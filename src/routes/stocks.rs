use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::db;
use crate::errors::AppError;
use crate::models::StockRecord;
use crate::state::AppState;

/// Records returned per request, newest first.
const LATEST_LIMIT: i64 = 10;

#[derive(Debug, Deserialize)]
pub struct StocksQuery {
    pub ticker: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_stock_records))
}

pub async fn get_stock_records(
    Query(query): Query<StocksQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<StockRecord>>, AppError> {
    let ticker = match query.ticker.as_deref().map(str::trim) {
        Some(t) if !t.is_empty() => t.to_uppercase(),
        _ => {
            warn!("GET /api/stocks - Missing ticker query parameter");
            return Err(AppError::Validation("Ticker query parameter required".to_string()));
        }
    };

    info!("GET /api/stocks - Fetching records for ticker: {}", ticker);
    let records = db::stock_record_queries::fetch_latest(&state.pool, &ticker, LATEST_LIMIT)
        .await
        .map_err(|e| {
            error!("DB fetch error for {}: {}", ticker, e);
            AppError::Db(e)
        })?;

    info!("✓ Found {} records for {}", records.len(), ticker);
    Ok(Json(records))
}
