use async_trait::async_trait;
use sqlx::PgPool;

use crate::db;
use crate::errors::AppError;
use crate::models::PriceSeries;

/// Stores one pipeline run: a row per trading day, each carrying the full
/// insight list.
#[async_trait]
pub trait StockRecordWriter: Send + Sync {
    async fn write_run(&self, series: &PriceSeries, insights: &[String]) -> Result<usize, AppError>;
}

pub struct PgStockRecordWriter {
    pool: PgPool,
}

impl PgStockRecordWriter {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StockRecordWriter for PgStockRecordWriter {
    async fn write_run(&self, series: &PriceSeries, insights: &[String]) -> Result<usize, AppError> {
        let written = db::stock_record_queries::upsert_run(
            &self.pool,
            &series.ticker,
            &series.bars,
            insights,
        )
        .await?;
        Ok(written)
    }
}
