//! Quantitative strategy execution engine.
//!
//! Pure and synchronous: bars in, signals/metrics/backtests out. All I/O
//! (market data, transport, pacing) lives with the callers.

pub mod backtest;
pub mod indicators;
pub mod metrics;
pub mod params;
pub mod signals;
pub mod strategies;
pub mod stream;

pub use backtest::{run_backtest, DEFAULT_SIZE_FRACTION};
pub use metrics::compute_metrics;
pub use params::Params;
pub use strategies::{Artifacts, StrategyDef, StrategyRegistry};
pub use stream::{stream_strategy, Cancelled, ScriptCtx, StepSink};

use common::{
    Bar, EngineError, IndicatorSeries, Interval, Metrics, Result, Signal, StrategyOutput,
};

/// One complete synchronous execution: signals, score, overlay channels and
/// the posture summary.
#[derive(Debug, Clone)]
pub struct StrategyRun {
    pub signals: Vec<Signal>,
    pub metrics: Metrics,
    pub indicator_data: IndicatorSeries,
    pub output: StrategyOutput,
}

/// Merge and validate user parameters against a strategy's defaults,
/// including the strategy's own cross-field rules.
pub fn resolve_params(
    def: &StrategyDef,
    user: &serde_json::Map<String, serde_json::Value>,
) -> Result<Params> {
    let params = Params::resolve(def.defaults, user)?;
    if let Some(validate) = def.validate {
        validate(&params).map_err(EngineError::InvalidParams)?;
    }
    Ok(params)
}

/// The synchronous run path: resolve -> validate -> signal -> score.
/// Data loading belongs to the caller; `bars` may be any length and short
/// series simply produce no signals.
pub fn run_strategy(
    registry: &StrategyRegistry,
    key: &str,
    bars: &[Bar],
    interval: Interval,
    user_params: &serde_json::Map<String, serde_json::Value>,
) -> Result<StrategyRun> {
    let def = registry
        .get(key)
        .ok_or_else(|| EngineError::UnknownStrategy(key.to_string()))?;
    let params = resolve_params(def, user_params)?;

    let artifacts = (def.run)(bars, &params);
    let metrics = compute_metrics(bars, &artifacts.signals, interval);
    Ok(StrategyRun {
        signals: artifacts.signals,
        metrics,
        indicator_data: artifacts.indicators,
        output: artifacts.output,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    #[test]
    fn unknown_strategy_is_reported_as_such() {
        let registry = StrategyRegistry::new();
        let err = run_strategy(
            &registry,
            "quantum_oracle",
            &make_bars(&[1.0, 2.0]),
            Interval::D1,
            &serde_json::Map::new(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), "unknown_strategy");
    }

    #[test]
    fn invalid_params_surface_before_any_computation() {
        let registry = StrategyRegistry::new();
        let err = run_strategy(
            &registry,
            "ma_crossover",
            &make_bars(&[1.0, 2.0, 3.0]),
            Interval::D1,
            &serde_json::from_str(r#"{"fast_period": 30, "slow_period": 10}"#).unwrap(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), "invalid_params");
    }

    #[test]
    fn short_series_produce_a_valid_empty_run() {
        let registry = StrategyRegistry::new();
        let run = run_strategy(
            &registry,
            "ma_crossover",
            &make_bars(&[10.0, 11.0, 12.0]),
            Interval::D1,
            &serde_json::Map::new(),
        )
        .unwrap();
        assert!(run.signals.is_empty());
        assert_eq!(run.metrics, Metrics::empty());
        for (_, channel) in run.indicator_data.channels() {
            assert_eq!(channel.len(), 3);
        }
    }
}
