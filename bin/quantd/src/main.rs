use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use common::Config;
use providers::{ChatClient, YahooClient};
use quant::StrategyRegistry;

#[tokio::main]
async fn main() {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // ── Config ────────────────────────────────────────────────────────────────
    let cfg = Config::from_env();
    let provider_timeout = Duration::from_secs(cfg.provider_timeout_secs);
    info!(port = cfg.port, "quantd starting");

    // ── Providers ─────────────────────────────────────────────────────────────
    let market = Arc::new(YahooClient::new(
        cfg.market_data_base_url.clone(),
        provider_timeout,
    ));
    if cfg.llm_api_key.is_none() {
        info!("LLM_API_KEY not set; /quant/ai-insight will report the provider as unavailable");
    }
    let llm = Arc::new(ChatClient::new(
        cfg.llm_base_url.clone(),
        cfg.llm_api_key.clone(),
        cfg.llm_model.clone(),
    ));

    // ── Strategy registry ─────────────────────────────────────────────────────
    let registry = Arc::new(StrategyRegistry::new());
    info!(strategies = registry.len(), "strategy catalog initialized");

    // ── API ───────────────────────────────────────────────────────────────────
    let state = api::AppState {
        market,
        llm,
        registry,
        provider_timeout,
    };
    api::serve(state, cfg.port).await;
}
