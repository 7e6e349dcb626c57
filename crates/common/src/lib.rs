pub mod config;
pub mod error;
pub mod sanitize;
pub mod types;

pub use config::Config;
pub use error::{EngineError, Result};
pub use sanitize::{finite, Channel, IndicatorSeries};
pub use types::{
    BacktestReport, Bar, Category, EquityPoint, FilterState, Interval, Metrics, MlPrediction,
    MomentumZone, ParamValue, Period, Quote, RiskLabel, Side, Signal, StepEvent,
    StrategyDescriptor, StrategyOutput, TradeAction, TradeRecord, TrendDirection, VolRegime,
};

/// Fixed compliance text stamped on every response that carries performance
/// numbers. Not generated, not configurable.
pub const DISCLAIMER: &str =
    "This analysis is algorithmically generated and does not constitute financial advice. \
     Past performance is not indicative of future results. All trading involves risk.";
