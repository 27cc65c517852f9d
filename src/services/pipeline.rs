use std::sync::Arc;

use tracing::{info, warn};

use crate::errors::AppError;
use crate::external::price_provider::PriceProvider;
use crate::models::PriceSeries;
use crate::services::insight_service;
use crate::services::llm_service::LlmProvider;
use crate::services::persistence_service::StockRecordWriter;
use crate::services::price_service;

/// Progress notifications emitted while a run moves through its stages.
#[derive(Debug)]
pub enum PipelineEvent<'a> {
    Fetching { ticker: &'a str },
    Fetched(&'a PriceSeries),
    Generating,
    Generated(&'a [String]),
    Saving,
    Saved { rows: usize },
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub ticker: String,
    pub series: PriceSeries,
    pub insights: Vec<String>,
    pub rows_written: usize,
}

/// Fetch prices, generate insights once, persist both.
pub struct InsightPipeline {
    prices: Arc<dyn PriceProvider>,
    llm: Arc<dyn LlmProvider>,
    writer: Arc<dyn StockRecordWriter>,
}

impl InsightPipeline {
    pub fn new(
        prices: Arc<dyn PriceProvider>,
        llm: Arc<dyn LlmProvider>,
        writer: Arc<dyn StockRecordWriter>,
    ) -> Self {
        Self { prices, llm, writer }
    }

    pub async fn run<F>(&self, raw_ticker: &str, mut on_event: F) -> Result<RunReport, AppError>
    where
        F: FnMut(PipelineEvent<'_>),
    {
        let ticker = price_service::normalize_ticker(raw_ticker)?;
        info!("Starting insight run for {}", ticker);

        on_event(PipelineEvent::Fetching { ticker: &ticker });
        let series = price_service::fetch_recent(self.prices.as_ref(), &ticker).await?;
        if series.is_empty() {
            warn!("No trading days returned for {}", ticker);
        }
        on_event(PipelineEvent::Fetched(&series));

        on_event(PipelineEvent::Generating);
        let insights = insight_service::generate_insights(self.llm.as_ref(), &series).await?;
        on_event(PipelineEvent::Generated(&insights));

        on_event(PipelineEvent::Saving);
        let rows_written = self.writer.write_run(&series, &insights).await?;
        on_event(PipelineEvent::Saved { rows: rows_written });

        info!("Finished insight run for {} ({} rows)", ticker, rows_written);

        Ok(RunReport {
            ticker,
            series,
            insights,
            rows_written,
        })
    }
}
