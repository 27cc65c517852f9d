use crate::config::MarketDataConfig;
use crate::external::price_provider::{PriceProvider, PriceProviderError};
use crate::models::PriceBar;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

/// Yahoo Finance chart API. No API key required.
pub struct YahooFinanceProvider {
    client: reqwest::Client,
    base_url: Url,
}

impl YahooFinanceProvider {
    pub fn new(config: &MarketDataConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent("Mozilla/5.0 (compatible; StockInsights/0.1)")
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            base_url: config.base_url.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct YahooChartResponse {
    chart: YahooChart,
}

#[derive(Debug, Deserialize)]
struct YahooChart {
    result: Option<Vec<YahooResult>>,
    error: Option<YahooError>,
}

#[derive(Debug, Deserialize)]
struct YahooError {
    description: String,
}

#[derive(Debug, Deserialize)]
struct YahooResult {
    meta: Option<YahooMeta>,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: YahooIndicators,
}

#[derive(Debug, Deserialize)]
struct YahooMeta {
    gmtoffset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct YahooIndicators {
    quote: Vec<YahooQuote>,
}

#[derive(Debug, Deserialize)]
struct YahooQuote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<u64>>,
}

/// Maps a day count onto the coarse ranges the chart API accepts.
fn range_for_days(days: u32) -> &'static str {
    if days <= 5 {
        "5d"
    } else if days <= 30 {
        "1mo"
    } else if days <= 90 {
        "3mo"
    } else if days <= 180 {
        "6mo"
    } else if days <= 365 {
        "1y"
    } else {
        "2y"
    }
}

fn chart_error(error: YahooError) -> PriceProviderError {
    if error.description.contains("No data found") {
        PriceProviderError::NotFound
    } else {
        PriceProviderError::BadResponse(error.description)
    }
}

/// Appends `v8/finance/chart/{ticker}` to the base URL, escaping the ticker
/// as a single path segment.
fn chart_url(base_url: &Url, ticker: &str) -> Result<Url, PriceProviderError> {
    let mut url = base_url.clone();
    url.path_segments_mut()
        .map_err(|_| PriceProviderError::BadResponse(format!("{} cannot hold a path", base_url)))?
        .pop_if_empty()
        .extend(&["v8", "finance", "chart", ticker]);
    Ok(url)
}

/// Maps a non-success chart API response onto a provider error.
fn status_error(status: StatusCode, body: &str) -> PriceProviderError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => PriceProviderError::RateLimited,
        StatusCode::NOT_FOUND => PriceProviderError::NotFound,
        // The chart API reports most failures in the body.
        _ => match serde_json::from_str::<YahooChartResponse>(body) {
            Ok(YahooChartResponse { chart: YahooChart { error: Some(error), .. } }) => {
                chart_error(error)
            }
            _ => PriceProviderError::BadResponse(format!("HTTP {}", status)),
        },
    }
}

/// Decodes a chart API body into daily bars, oldest first.
///
/// Rows with any missing OHLCV value (halts, the in-progress session) are
/// skipped. Bar dates are taken in the exchange's local time using the
/// `gmtoffset` reported in the response metadata. When two rows fall on the
/// same local date only the one with the latest timestamp is kept.
fn decode_chart(body: &str) -> Result<Vec<PriceBar>, PriceProviderError> {
    let body: YahooChartResponse =
        serde_json::from_str(body).map_err(|e| PriceProviderError::Parse(e.to_string()))?;

    if let Some(error) = body.chart.error {
        return Err(chart_error(error));
    }

    let result = body
        .chart
        .result
        .and_then(|mut r| if r.is_empty() { None } else { Some(r.swap_remove(0)) })
        .ok_or(PriceProviderError::NotFound)?;

    let quote = result
        .indicators
        .quote
        .first()
        .ok_or_else(|| PriceProviderError::BadResponse("No quote data in response".into()))?;

    let n = result.timestamp.len();
    if [quote.open.len(), quote.high.len(), quote.low.len(), quote.close.len(), quote.volume.len()]
        .iter()
        .any(|&len| len != n)
    {
        return Err(PriceProviderError::Parse(
            "Timestamp and quote arrays have different lengths".into(),
        ));
    }

    let offset = result.meta.and_then(|m| m.gmtoffset).unwrap_or(0);

    let mut rows = Vec::with_capacity(n);
    for (i, &ts) in result.timestamp.iter().enumerate() {
        let (Some(open), Some(high), Some(low), Some(close), Some(volume)) = (
            quote.open[i],
            quote.high[i],
            quote.low[i],
            quote.close[i],
            quote.volume[i],
        ) else {
            debug!("Skipping incomplete bar at timestamp {}", ts);
            continue;
        };

        let date = chrono::DateTime::from_timestamp(ts + offset, 0)
            .map(|dt| dt.date_naive())
            .ok_or_else(|| PriceProviderError::Parse(format!("bad timestamp {}", ts)))?;

        rows.push((
            ts,
            PriceBar {
                date,
                open,
                high,
                low,
                close,
                volume,
            },
        ));
    }

    // Newest timestamp first within a day, so dedup keeps it.
    rows.sort_by(|(ts_a, a), (ts_b, b)| a.date.cmp(&b.date).then(ts_b.cmp(ts_a)));
    rows.dedup_by_key(|(_, bar)| bar.date);
    let bars: Vec<PriceBar> = rows.into_iter().map(|(_, bar)| bar).collect();

    if bars.is_empty() {
        return Err(PriceProviderError::NotFound);
    }

    Ok(bars)
}

#[async_trait]
impl PriceProvider for YahooFinanceProvider {
    async fn fetch_daily_bars(
        &self,
        ticker: &str,
        days: u32,
    ) -> Result<Vec<PriceBar>, PriceProviderError> {
        let url = chart_url(&self.base_url, ticker)?;

        let resp = self
            .client
            .get(url)
            .query(&[("interval", "1d"), ("range", range_for_days(days))])
            .send()
            .await
            .map_err(|e| PriceProviderError::Network(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| PriceProviderError::Network(e.to_string()))?;

        if !status.is_success() {
            warn!("Yahoo Finance returned HTTP {} for {}", status, ticker);
            return Err(status_error(status, &body));
        }

        decode_chart(&body)
    }
}
