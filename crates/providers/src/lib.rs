//! External collaborators the engine consumes: market data and LLM insight.
//!
//! Both are trait seams so the API layer can be exercised with in-memory
//! fakes; the real clients speak HTTP via reqwest.

pub mod llm;
pub mod yahoo;

pub use llm::ChatClient;
pub use yahoo::YahooClient;

use async_trait::async_trait;

use common::{Bar, Interval, Period, Quote, Result};

/// Supplies quote snapshots and OHLCV history. Implementations must be safe
/// for concurrent calls; the engine never serializes access.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Historical bars in ascending time. An unknown ticker yields an empty
    /// list, not an error.
    async fn get_history(
        &self,
        ticker: &str,
        period: Period,
        interval: Interval,
    ) -> Result<Vec<Bar>>;

    /// Latest quote snapshot for a ticker.
    async fn get_quote(&self, ticker: &str) -> Result<Quote>;
}

/// Turns a strategy-result record into a short natural-language insight.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn insight(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;
}
