mod app;
mod cli;
mod config;
mod db;
mod errors;
mod external;
mod logging;
mod models;
mod routes;
mod services;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;

use crate::cli::{Cli, Command};
use crate::config::{AppConfig, DatabaseConfig};
use crate::external::yahoofinance::YahooFinanceProvider;
use crate::logging::LoggingConfig;
use crate::services::llm_service::OpenAiProvider;
use crate::services::persistence_service::PgStockRecordWriter;
use crate::services::pipeline::InsightPipeline;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();

    logging::init_logging(LoggingConfig::from_env())
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    match cli.command.unwrap_or(Command::Run { ticker: None }) {
        Command::Run { ticker } => run(ticker).await,
        Command::Migrate => migrate().await,
        Command::Serve { port } => serve(port).await,
    }
}

async fn run(ticker: Option<String>) -> anyhow::Result<()> {
    // Secrets are checked before the prompt and before any network call.
    let config = AppConfig::from_env()?;

    let raw_ticker = match ticker {
        Some(t) => t,
        None => cli::prompt_ticker().await.context("Failed to read ticker from stdin")?,
    };

    let pool = db::lazy_pool(&config.database, 1)?;
    let pipeline = InsightPipeline::new(
        Arc::new(YahooFinanceProvider::new(&config.market_data)),
        Arc::new(OpenAiProvider::new(&config.llm)?),
        Arc::new(PgStockRecordWriter::new(pool.clone())),
    );

    let result = pipeline.run(&raw_ticker, cli::print_event).await;
    pool.close().await;

    let report = result?;
    tracing::info!(
        "Run complete for {}: {} trading days, {} insights, {} rows saved",
        report.ticker,
        report.series.len(),
        report.insights.len(),
        report.rows_written
    );
    Ok(())
}

async fn migrate() -> anyhow::Result<()> {
    let config = DatabaseConfig::from_env()?;
    let pool = db::lazy_pool(&config, 1)?;

    let result = db::stock_record_queries::run_migrations(&pool).await;
    pool.close().await;

    result.context("Failed to apply migrations")?;
    println!("DB ready");
    Ok(())
}

async fn serve(port: Option<u16>) -> anyhow::Result<()> {
    let db_config = DatabaseConfig::from_env()?;
    let port = match port {
        Some(p) => p,
        None => config::server_port_from_env()?,
    };

    let pool = db::lazy_pool(&db_config, 10)?;
    app::ensure_schema(&pool, app::SCHEMA_ATTEMPTS, app::SCHEMA_RETRY_DELAY).await;

    let app = app::create_app(AppState { pool });

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(&addr).await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("🚀 stock-insights API listening on http://{}/", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
