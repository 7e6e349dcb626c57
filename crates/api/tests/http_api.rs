use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use api::{app, AppState};
use common::{Bar, EngineError, Interval, Period, Quote, Result};
use providers::{LlmProvider, MarketDataProvider};
use quant::StrategyRegistry;

/// Serves a canned bar series; unknown tickers resolve to nothing and the
/// special ticker "DOWN" simulates a provider outage.
struct StaticMarket {
    bars: Vec<Bar>,
}

#[async_trait]
impl MarketDataProvider for StaticMarket {
    async fn get_history(&self, ticker: &str, _: Period, _: Interval) -> Result<Vec<Bar>> {
        match ticker {
            "NOPE" => Ok(Vec::new()),
            "DOWN" => Err(EngineError::provider("upstream offline")),
            _ => Ok(self.bars.clone()),
        }
    }

    async fn get_quote(&self, ticker: &str) -> Result<Quote> {
        Ok(Quote {
            ticker: ticker.to_uppercase(),
            price: 100.0,
            previous_close: Some(99.0),
            day_high: Some(101.0),
            day_low: Some(98.5),
            volume: Some(1_000_000.0),
            ts: 1_700_000_000,
        })
    }
}

struct StaticLlm;

#[async_trait]
impl LlmProvider for StaticLlm {
    async fn insight(&self, _system: &str, _user: &str) -> Result<String> {
        Ok("Regime remains constructive; momentum is intact.".to_string())
    }
}

fn seed_bars() -> Vec<Bar> {
    let closes = [
        10.0, 11.0, 12.0, 13.0, 14.0, 10.0, 9.0, 8.0, 7.0, 6.0, 10.0, 12.0, 14.0, 16.0, 18.0,
    ];
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                ts: 1_700_000_000 + i as i64 * 86_400,
                open,
                high: open.max(close) + 0.5,
                low: open.min(close) - 0.5,
                close,
                volume: 1_000.0,
            }
        })
        .collect()
}

fn test_state() -> AppState {
    AppState {
        market: Arc::new(StaticMarket { bars: seed_bars() }),
        llm: Arc::new(StaticLlm),
        registry: Arc::new(StrategyRegistry::new()),
        provider_timeout: Duration::from_secs(10),
    }
}

async fn send_json(
    router: axum::Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let request = match body {
        Some(json) => Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    };

    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
    };
    (status, value)
}

#[tokio::test]
async fn strategies_lists_the_full_catalog() {
    let (status, body) = send_json(app(test_state()), "GET", "/quant/strategies", None).await;
    assert_eq!(status, StatusCode::OK);
    let list = body.as_array().unwrap();
    assert_eq!(list.len(), 20);
    assert!(list.iter().any(|d| d["key"] == "ma_crossover"));
    assert!(list
        .iter()
        .all(|d| d["default_params"].is_object() && d["category"].is_string()));
}

#[tokio::test]
async fn run_returns_signals_metrics_and_disclaimer() {
    let (status, body) = send_json(
        app(test_state()),
        "POST",
        "/quant/run",
        Some(serde_json::json!({
            "ticker": "aapl",
            "strategy": "ma_crossover",
            "period": "6mo",
            "interval": "1d",
            "params": {"fast_period": 3, "slow_period": 5}
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ticker"], "AAPL");
    assert_eq!(body["strategy"], "ma_crossover");
    let signals = body["signals"].as_array().unwrap();
    assert_eq!(signals.len(), 3);
    assert_eq!(signals[0]["side"], "BUY");
    assert_eq!(body["metrics"]["total_trades"], 2);
    assert_eq!(body["output_type"], "trend");
    assert!(body["disclaimer"].as_str().unwrap().contains("not constitute"));
}

#[tokio::test]
async fn unknown_strategy_is_a_400_with_machine_tag() {
    let (status, body) = send_json(
        app(test_state()),
        "POST",
        "/quant/run",
        Some(serde_json::json!({"ticker": "AAPL", "strategy": "quantum_oracle"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "unknown_strategy");
}

#[tokio::test]
async fn invalid_params_are_a_400() {
    let (status, body) = send_json(
        app(test_state()),
        "POST",
        "/quant/run",
        Some(serde_json::json!({
            "ticker": "AAPL",
            "strategy": "ma_crossover",
            "params": {"fast_period": 30, "slow_period": 10}
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_params");
}

#[tokio::test]
async fn unresolved_ticker_is_a_404_and_outage_a_502() {
    let (status, body) = send_json(
        app(test_state()),
        "POST",
        "/quant/run",
        Some(serde_json::json!({"ticker": "NOPE", "strategy": "ma_crossover"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "data_unavailable");

    let (status, body) = send_json(
        app(test_state()),
        "POST",
        "/quant/run",
        Some(serde_json::json!({"ticker": "DOWN", "strategy": "ma_crossover"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "data_unavailable");
}

#[tokio::test]
async fn backtest_extends_the_run_response() {
    let (status, body) = send_json(
        app(test_state()),
        "POST",
        "/quant/backtest",
        Some(serde_json::json!({
            "ticker": "AAPL",
            "strategy": "ma_crossover",
            "initial_capital": 10000.0,
            "params": {"fast_period": 3, "slow_period": 5}
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["initial_capital"], 10000.0);
    assert_eq!(body["equity_curve"].as_array().unwrap().len(), 15);
    let trade_log = body["trade_log"].as_array().unwrap();
    assert_eq!(trade_log.len(), 4);
    assert_eq!(trade_log.last().unwrap()["action"], "CLOSE");
    assert!(body["final_value"].is_number());
    assert!(body["disclaimer"].is_string());
}

#[tokio::test]
async fn backtest_rejects_non_positive_capital() {
    let (status, body) = send_json(
        app(test_state()),
        "POST",
        "/quant/backtest",
        Some(serde_json::json!({
            "ticker": "AAPL",
            "strategy": "ma_crossover",
            "initial_capital": 0.0
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_params");
}

#[tokio::test]
async fn insight_forwards_to_the_llm_and_stamps_the_disclaimer() {
    let (status, body) = send_json(
        app(test_state()),
        "POST",
        "/quant/ai-insight",
        Some(serde_json::json!({
            "ticker": "AAPL",
            "strategy": "ma_crossover",
            "metrics": {"sharpe": 1.2, "win_rate": 0.6}
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["insight"].as_str().unwrap().contains("momentum"));
    assert!(body["disclaimer"].is_string());
}

#[tokio::test]
async fn healthz_reports_the_catalog_size() {
    let (status, body) = send_json(app(test_state()), "GET", "/healthz", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["strategies"], 20);
}

#[tokio::test]
async fn stream_emits_six_named_events_ending_complete() {
    let uri = "/quant/stream/run?ticker=AAPL&strategy=ma_crossover&period=6mo&interval=1d&params=%7B%22fast_period%22%3A3%2C%22slow_period%22%3A5%7D";
    let response = app(test_state())
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("text/event-stream"));

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();

    let step_count = text.matches("event: step").count();
    let complete_count = text.matches("event: complete").count();
    assert_eq!(step_count, 5, "expected five step events, got:\n{text}");
    assert_eq!(complete_count, 1, "expected one complete event, got:\n{text}");
    assert!(!text.contains("event: error"));

    // Terminal payload reaches 100 and is valid JSON.
    let last_data = text
        .lines()
        .filter_map(|l| l.strip_prefix("data: "))
        .last()
        .unwrap();
    let payload: serde_json::Value = serde_json::from_str(last_data).unwrap();
    assert_eq!(payload["progress"], 100);
    assert_eq!(payload["final"], true);
}

#[tokio::test]
async fn stream_with_unknown_strategy_is_one_error_event() {
    let uri = "/quant/stream/run?ticker=AAPL&strategy=quantum_oracle";
    let response = app(test_state())
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();

    assert_eq!(text.matches("event: error").count(), 1);
    assert_eq!(text.matches("event: step").count(), 0);
    assert!(text.contains("unknown_strategy"));
}
