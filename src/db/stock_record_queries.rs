use sqlx::types::Json;
use sqlx::PgPool;
use tracing::{error, info};

use crate::models::{DailyPrices, PriceBar, StockRecord};

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Creates `stock_records` if it does not exist yet.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await
}

/// Upsert one row per bar inside a single transaction.
///
/// Every row carries the same `insights`. Nothing is visible to readers until
/// the commit; an error on any row drops the transaction, which rolls back the
/// whole run. Returns the number of rows written.
pub async fn upsert_run(
    pool: &PgPool,
    ticker: &str,
    bars: &[PriceBar],
    insights: &[String],
) -> Result<usize, sqlx::Error> {
    let mut tx = pool.begin().await.map_err(|e| {
        error!("Failed to begin transaction for ticker {}: {}", ticker, e);
        e
    })?;

    for bar in bars {
        if let Err(e) = sqlx::query(
            r#"
            INSERT INTO stock_records (ticker, record_date, prices, insights)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (ticker, record_date)
            DO UPDATE SET prices = EXCLUDED.prices, insights = EXCLUDED.insights
            "#,
        )
        .bind(ticker)
        .bind(bar.date)
        .bind(Json(DailyPrices::from(bar)))
        .bind(Json(insights))
        .execute(&mut *tx)
        .await
        {
            error!("Failed to upsert stock record for ticker {} (date: {}): {}", ticker, bar.date, e);
            return Err(e);
        }
    }

    tx.commit().await.map_err(|e| {
        error!("Failed to commit transaction for ticker {}: {}", ticker, e);
        e
    })?;

    info!("✓ Upserted {} stock records for {}", bars.len(), ticker);
    Ok(bars.len())
}

/// Newest `limit` records for a ticker, latest date first.
pub async fn fetch_latest(
    pool: &PgPool,
    ticker: &str,
    limit: i64,
) -> Result<Vec<StockRecord>, sqlx::Error> {
    sqlx::query_as::<_, StockRecord>(
        r#"
        SELECT id, ticker, record_date, prices, insights, created_at
        FROM stock_records
        WHERE ticker = $1
        ORDER BY record_date DESC
        LIMIT $2
        "#,
    )
    .bind(ticker)
    .bind(limit)
    .fetch_all(pool)
    .await
}
