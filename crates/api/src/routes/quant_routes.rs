use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use common::{
    BacktestReport, Bar, EngineError, IndicatorSeries, Interval, Metrics, Period, Signal,
    StrategyDescriptor, StrategyOutput, DISCLAIMER,
};
use quant::DEFAULT_SIZE_FRACTION;

use crate::error::ApiError;
use crate::AppState;

pub fn quant_router() -> Router<AppState> {
    Router::new()
        .route("/quant/strategies", get(list_strategies))
        .route("/quant/run", post(run))
        .route("/quant/backtest", post(backtest))
        .route("/quant/ai-insight", post(ai_insight))
}

// ─── Requests / responses ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RunRequest {
    pub ticker: String,
    pub strategy: String,
    #[serde(default = "default_period")]
    pub period: Period,
    #[serde(default = "default_interval")]
    pub interval: Interval,
    #[serde(default)]
    pub params: serde_json::Map<String, Value>,
}

fn default_period() -> Period {
    Period::Mo6
}

fn default_interval() -> Interval {
    Interval::D1
}

#[derive(Debug, Deserialize)]
pub struct BacktestRequest {
    #[serde(flatten)]
    pub run: RunRequest,
    #[serde(default = "default_capital")]
    pub initial_capital: f64,
}

fn default_capital() -> f64 {
    100_000.0
}

#[derive(Serialize)]
struct RunResponse {
    ticker: String,
    strategy: String,
    signals: Vec<Signal>,
    metrics: Metrics,
    indicator_data: IndicatorSeries,
    output_type: &'static str,
    output: StrategyOutput,
    disclaimer: &'static str,
}

#[derive(Serialize)]
struct BacktestResponse {
    ticker: String,
    strategy: String,
    signals: Vec<Signal>,
    metrics: Metrics,
    indicator_data: IndicatorSeries,
    output_type: &'static str,
    output: StrategyOutput,
    initial_capital: f64,
    final_value: f64,
    total_return_pct: f64,
    equity_curve: Vec<common::EquityPoint>,
    trade_log: Vec<common::TradeRecord>,
    disclaimer: &'static str,
}

// ─── Handlers ─────────────────────────────────────────────────────────────────

async fn list_strategies(State(state): State<AppState>) -> Json<Vec<StrategyDescriptor>> {
    Json(state.registry.descriptors())
}

async fn run(
    State(state): State<AppState>,
    Json(body): Json<RunRequest>,
) -> Result<Json<RunResponse>, ApiError> {
    let bars = fetch_history(&state, &body.ticker, body.period, body.interval).await?;
    let run = quant::run_strategy(
        &state.registry,
        &body.strategy,
        &bars,
        body.interval,
        &body.params,
    )?;

    info!(
        ticker = %body.ticker,
        strategy = %body.strategy,
        signals = run.signals.len(),
        "strategy run complete"
    );

    Ok(Json(RunResponse {
        ticker: body.ticker.to_uppercase(),
        strategy: body.strategy,
        signals: run.signals,
        metrics: run.metrics,
        indicator_data: run.indicator_data,
        output_type: run.output.kind(),
        output: run.output,
        disclaimer: DISCLAIMER,
    }))
}

async fn backtest(
    State(state): State<AppState>,
    Json(body): Json<BacktestRequest>,
) -> Result<Json<BacktestResponse>, ApiError> {
    if !body.initial_capital.is_finite() || body.initial_capital <= 0.0 {
        return Err(EngineError::InvalidParams(format!(
            "initial_capital must be positive, got {}",
            body.initial_capital
        ))
        .into());
    }

    let req = body.run;
    let bars = fetch_history(&state, &req.ticker, req.period, req.interval).await?;
    let run = quant::run_strategy(
        &state.registry,
        &req.strategy,
        &bars,
        req.interval,
        &req.params,
    )?;
    let BacktestReport {
        metrics,
        initial_capital,
        final_value,
        total_return_pct,
        equity_curve,
        trade_log,
    } = quant::run_backtest(
        &bars,
        &run.signals,
        req.interval,
        body.initial_capital,
        DEFAULT_SIZE_FRACTION,
    );

    info!(
        ticker = %req.ticker,
        strategy = %req.strategy,
        final_value,
        "backtest complete"
    );

    Ok(Json(BacktestResponse {
        ticker: req.ticker.to_uppercase(),
        strategy: req.strategy,
        signals: run.signals,
        metrics,
        indicator_data: run.indicator_data,
        output_type: run.output.kind(),
        output: run.output,
        initial_capital,
        final_value,
        total_return_pct,
        equity_curve,
        trade_log,
        disclaimer: DISCLAIMER,
    }))
}

// ─── AI insight ───────────────────────────────────────────────────────────────

const INSIGHT_SYSTEM_PROMPT: &str = "\
You are a senior quantitative analyst at an institutional trading desk. \
Generate a concise, professional market analysis based on the strategy \
execution results provided. Use precise quantitative language, reference \
specific metrics, and avoid colloquial expressions. Structure: 1-2 sentence \
market regime assessment, 1-2 sentence strategy performance summary, 1 \
sentence risk assessment, 1 sentence actionable conclusion. Maximum 150 \
words. No emojis, no disclaimers in the body.";

#[derive(Debug, Deserialize)]
pub struct InsightRequest {
    pub ticker: String,
    pub strategy: String,
    pub metrics: Value,
    #[serde(default)]
    pub signals_summary: Option<Value>,
}

#[derive(Serialize)]
struct InsightResponse {
    ticker: String,
    strategy: String,
    insight: String,
    disclaimer: &'static str,
}

async fn ai_insight(
    State(state): State<AppState>,
    Json(body): Json<InsightRequest>,
) -> Result<Json<InsightResponse>, ApiError> {
    let mut user_prompt = format!(
        "Ticker: {}\nStrategy: {}\nMetrics: {}\n",
        body.ticker, body.strategy, body.metrics
    );
    if let Some(summary) = &body.signals_summary {
        user_prompt.push_str(&format!("Signals Summary: {summary}\n"));
    }

    let insight = tokio::time::timeout(
        state.provider_timeout.max(std::time::Duration::from_secs(30)),
        state.llm.insight(INSIGHT_SYSTEM_PROMPT, &user_prompt),
    )
    .await
    .map_err(|_| EngineError::provider("insight generation timed out"))??;

    Ok(Json(InsightResponse {
        ticker: body.ticker.to_uppercase(),
        strategy: body.strategy,
        insight,
        disclaimer: DISCLAIMER,
    }))
}

// ─── Shared helpers ───────────────────────────────────────────────────────────

/// Fetch history under the provider deadline, mapping an empty series to the
/// non-retryable "no data" error.
pub(crate) async fn fetch_history(
    state: &AppState,
    ticker: &str,
    period: Period,
    interval: Interval,
) -> Result<Vec<Bar>, EngineError> {
    let bars = tokio::time::timeout(
        state.provider_timeout,
        state.market.get_history(ticker, period, interval),
    )
    .await
    .map_err(|_| {
        EngineError::provider(format!(
            "market data request for {ticker} exceeded {}s",
            state.provider_timeout.as_secs()
        ))
    })??;

    if bars.is_empty() {
        return Err(EngineError::no_data(ticker));
    }
    Ok(bars)
}
