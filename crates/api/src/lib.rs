pub mod error;
pub mod routes;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use providers::{LlmProvider, MarketDataProvider};
use quant::StrategyRegistry;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

/// Shared application state injected into every route handler. The registry
/// is immutable after startup; the providers are internally concurrent.
#[derive(Clone)]
pub struct AppState {
    pub market: Arc<dyn MarketDataProvider>,
    pub llm: Arc<dyn LlmProvider>,
    pub registry: Arc<StrategyRegistry>,
    /// Deadline applied to every provider call.
    pub provider_timeout: Duration,
}

/// Assemble the full application router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers(Any)
        .allow_methods(Any);

    Router::new()
        .merge(routes::quant_router())
        .merge(routes::stream_router())
        .merge(routes::ws_router())
        .merge(routes::health_router())
        .with_state(state)
        .layer(cors)
}

/// Build and run the API server.
pub async fn serve(state: AppState, port: u16) {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "Quant engine API listening");
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app(state)).await.unwrap();
}
