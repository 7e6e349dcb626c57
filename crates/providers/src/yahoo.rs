use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use common::{Bar, EngineError, Interval, Period, Quote, Result};

use crate::MarketDataProvider;

/// Market data client for the Yahoo Finance chart API.
///
/// History and quotes both come from `/v8/finance/chart/{ticker}`; the chart
/// payload carries the OHLCV arrays and the latest-quote metadata in one
/// response. No authentication is required.
pub struct YahooClient {
    base_url: String,
    http: Client,
}

impl YahooClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            http: Client::builder()
                .use_rustls_tls()
                .timeout(timeout)
                .user_agent("quantd/0.1")
                .build()
                .expect("Failed to build HTTP client"),
        }
    }

    async fn fetch_chart(&self, ticker: &str, range: &str, interval: &str) -> Result<ChartResult> {
        let url = format!(
            "{}/v8/finance/chart/{}?range={}&interval={}",
            self.base_url, ticker, range, interval
        );
        debug!(%ticker, %range, %interval, "Fetching chart data");

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| EngineError::provider(e.to_string()))?;

        // Yahoo answers unknown tickers with 404 and an error body; the
        // contract maps that to "no data", not a provider fault.
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(EngineError::no_data(ticker));
        }
        let status = resp.status();
        let body: ChartResponse = resp
            .json()
            .await
            .map_err(|e| EngineError::provider(format!("HTTP {status}: {e}")))?;

        body.chart
            .result
            .and_then(|mut results| {
                if results.is_empty() {
                    None
                } else {
                    Some(results.remove(0))
                }
            })
            .ok_or_else(|| EngineError::no_data(ticker))
    }
}

#[async_trait]
impl MarketDataProvider for YahooClient {
    async fn get_history(
        &self,
        ticker: &str,
        period: Period,
        interval: Interval,
    ) -> Result<Vec<Bar>> {
        let chart = match self
            .fetch_chart(ticker, period.as_str(), interval.as_str())
            .await
        {
            Ok(chart) => chart,
            Err(EngineError::DataUnavailable { retryable: false, .. }) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let quote = match chart.indicators.quote.into_iter().next() {
            Some(q) => q,
            None => return Ok(Vec::new()),
        };

        let mut bars = Vec::with_capacity(chart.timestamp.len());
        for (i, ts) in chart.timestamp.iter().enumerate() {
            // A bar without a close is a gap in the feed, not a hole to carry.
            let Some(close) = value_at(&quote.close, i) else {
                continue;
            };
            bars.push(Bar {
                ts: *ts,
                open: value_at(&quote.open, i).unwrap_or(f64::NAN),
                high: value_at(&quote.high, i).unwrap_or(f64::NAN),
                low: value_at(&quote.low, i).unwrap_or(f64::NAN),
                close,
                volume: value_at(&quote.volume, i).unwrap_or(f64::NAN),
            });
        }
        bars.sort_by_key(|b| b.ts);
        bars.dedup_by_key(|b| b.ts);
        Ok(bars)
    }

    async fn get_quote(&self, ticker: &str) -> Result<Quote> {
        let chart = self.fetch_chart(ticker, "1d", "1d").await?;
        let meta = chart.meta;

        let price = meta
            .regular_market_price
            .filter(|p| p.is_finite())
            .ok_or_else(|| EngineError::no_data(ticker))?;

        Ok(Quote {
            ticker: ticker.to_uppercase(),
            price,
            previous_close: meta
                .chart_previous_close
                .or(meta.previous_close)
                .filter(|v| v.is_finite()),
            day_high: meta.regular_market_day_high.filter(|v| v.is_finite()),
            day_low: meta.regular_market_day_low.filter(|v| v.is_finite()),
            volume: meta.regular_market_volume.filter(|v| v.is_finite()),
            ts: meta.regular_market_time.unwrap_or_default(),
        })
    }
}

fn value_at(channel: &Option<Vec<Option<f64>>>, i: usize) -> Option<f64> {
    channel
        .as_ref()
        .and_then(|values| values.get(i).copied().flatten())
        .filter(|v| v.is_finite())
}

// ─── Response types ───────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct ChartResponse {
    chart: ChartBody,
}

#[derive(Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
}

#[derive(Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: ChartIndicators,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    regular_market_price: Option<f64>,
    chart_previous_close: Option<f64>,
    previous_close: Option<f64>,
    regular_market_day_high: Option<f64>,
    regular_market_day_low: Option<f64>,
    regular_market_volume: Option<f64>,
    regular_market_time: Option<i64>,
}

#[derive(Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<QuoteArrays>,
}

#[derive(Deserialize, Default)]
struct QuoteArrays {
    open: Option<Vec<Option<f64>>>,
    high: Option<Vec<Option<f64>>>,
    low: Option<Vec<Option<f64>>>,
    close: Option<Vec<Option<f64>>>,
    volume: Option<Vec<Option<f64>>>,
}
