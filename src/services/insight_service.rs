use tracing::{error, info, warn};

use crate::errors::AppError;
use crate::models::PriceSeries;
use crate::services::llm_service::LlmProvider;

/// Number of insights the prompt asks for. Replies are not held to it.
pub const REQUESTED_INSIGHTS: usize = 3;

/// Renders the series as a fixed-width table, one line per trading day.
pub fn render_price_table(series: &PriceSeries) -> String {
    let mut table = format!(
        "{:>10} {:>10} {:>10} {:>10} {:>10} {:>12}\n",
        "Date", "Open", "High", "Low", "Close", "Volume"
    );
    for bar in series.iter() {
        table.push_str(&format!(
            "{:>10} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>12}\n",
            bar.date.to_string(),
            bar.open,
            bar.high,
            bar.low,
            bar.close,
            bar.volume
        ));
    }
    table
}

pub fn build_prompt(ticker: &str, series: &PriceSeries) -> String {
    format!(
        "You are a stock analyst. Given the following recent price data for {ticker}:\n\n\
         {table}\n\
         Provide {count} actionable insights in short sentences.",
        ticker = ticker,
        table = render_price_table(series),
        count = REQUESTED_INSIGHTS,
    )
}

fn is_bullet_or_space(c: char) -> bool {
    c == '-' || c == '•' || c.is_whitespace()
}

/// Splits a free-text model reply into insight lines.
///
/// Bullet markers (`-`, `•`) and whitespace are trimmed from both ends of
/// each line, blank lines are dropped and order is kept.
pub fn parse_insights(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| line.trim_matches(is_bullet_or_space))
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

pub async fn generate_insights(
    llm: &dyn LlmProvider,
    series: &PriceSeries,
) -> Result<Vec<String>, AppError> {
    let prompt = build_prompt(&series.ticker, series);

    let reply = llm.generate_completion(prompt).await.map_err(|e| {
        error!("Insight generation failed for {}: {}", series.ticker, e);
        AppError::Llm(e)
    })?;

    let insights = parse_insights(&reply);
    if insights.len() != REQUESTED_INSIGHTS {
        warn!(
            "Model returned {} insights for {} (asked for {})",
            insights.len(),
            series.ticker,
            REQUESTED_INSIGHTS
        );
    }
    info!("Generated {} insights for {}", insights.len(), series.ticker);

    Ok(insights)
}
