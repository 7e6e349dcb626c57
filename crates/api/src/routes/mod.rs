mod health;
mod quant_routes;
mod stream;
mod ws;

pub use health::health_router;
pub use quant_routes::quant_router;
pub use stream::stream_router;
pub use ws::ws_router;

pub(crate) use quant_routes::fetch_history;
