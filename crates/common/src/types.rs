use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::sanitize::IndicatorSeries;

/// One historical OHLCV observation. Timestamps are UTC seconds and strictly
/// increasing within a series; gaps are allowed but never interpolated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub ts: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Side of a recommendation signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// A discrete BUY/SELL recommendation anchored to a bar close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub ts: i64,
    pub side: Side,
    pub price: f64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub label: Option<String>,
}

/// History window accepted by the market-data provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "1d")]
    D1,
    #[serde(rename = "5d")]
    D5,
    #[serde(rename = "1mo")]
    Mo1,
    #[serde(rename = "3mo")]
    Mo3,
    #[serde(rename = "6mo")]
    Mo6,
    #[serde(rename = "1y")]
    Y1,
    #[serde(rename = "2y")]
    Y2,
    #[serde(rename = "5y")]
    Y5,
    #[serde(rename = "10y")]
    Y10,
    #[serde(rename = "ytd")]
    Ytd,
    #[serde(rename = "max")]
    Max,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::D1 => "1d",
            Period::D5 => "5d",
            Period::Mo1 => "1mo",
            Period::Mo3 => "3mo",
            Period::Mo6 => "6mo",
            Period::Y1 => "1y",
            Period::Y2 => "2y",
            Period::Y5 => "5y",
            Period::Y10 => "10y",
            Period::Ytd => "ytd",
            Period::Max => "max",
        }
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bar spacing accepted by the market-data provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "1m")]
    M1,
    #[serde(rename = "2m")]
    M2,
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "30m")]
    M30,
    #[serde(rename = "60m")]
    M60,
    #[serde(rename = "90m")]
    M90,
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "1d")]
    D1,
    #[serde(rename = "5d")]
    D5,
    #[serde(rename = "1wk")]
    W1,
    #[serde(rename = "1mo")]
    Mo1,
    #[serde(rename = "3mo")]
    Mo3,
}

impl Interval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::M1 => "1m",
            Interval::M2 => "2m",
            Interval::M5 => "5m",
            Interval::M15 => "15m",
            Interval::M30 => "30m",
            Interval::M60 => "60m",
            Interval::M90 => "90m",
            Interval::H1 => "1h",
            Interval::D1 => "1d",
            Interval::D5 => "5d",
            Interval::W1 => "1wk",
            Interval::Mo1 => "1mo",
            Interval::Mo3 => "3mo",
        }
    }

    /// Bars per year used to annualize Sharpe. Intraday values assume a
    /// 390-minute session over 252 trading days.
    pub fn bars_per_year(&self) -> f64 {
        match self {
            Interval::M1 => 252.0 * 390.0,
            Interval::M2 => 252.0 * 195.0,
            Interval::M5 => 252.0 * 78.0,
            Interval::M15 => 252.0 * 26.0,
            Interval::M30 => 252.0 * 13.0,
            Interval::M60 | Interval::H1 => 252.0 * 7.0,
            Interval::M90 => 252.0 * 4.0,
            Interval::D1 => 252.0,
            Interval::D5 => 50.0,
            Interval::W1 => 52.0,
            Interval::Mo1 => 12.0,
            Interval::Mo3 => 4.0,
        }
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strategy family. Determines which category output a strategy summarizes
/// its posture with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Trend,
    Momentum,
    MeanReversion,
    Volatility,
    MarketMicrostructure,
    Statistical,
    #[serde(rename = "MLProxy")]
    MlProxy,
}

/// Default parameter value carried in a strategy descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
}

/// Catalog entry describing one registered strategy. Keys are stable
/// identifiers; renaming a key is a breaking change.
#[derive(Debug, Clone, Serialize)]
pub struct StrategyDescriptor {
    pub key: &'static str,
    pub display_name: &'static str,
    pub category: Category,
    pub description: &'static str,
    pub default_params: BTreeMap<&'static str, ParamValue>,
}

/// Drawdown-based risk classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLabel {
    Low,
    Moderate,
    High,
}

/// Performance statistics for a signal set. Ratios are null when no closed
/// trades exist or when the underlying quantity is undefined (e.g. zero
/// return variance for Sharpe).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub sharpe: Option<f64>,
    pub max_drawdown_pct: Option<f64>,
    pub win_rate: Option<f64>,
    pub total_trades: u32,
    pub profit_factor: Option<f64>,
    pub avg_win: Option<f64>,
    pub avg_loss: Option<f64>,
    pub risk_label: RiskLabel,
    pub confidence: f64,
    pub verdict: String,
    pub suggested_position_pct: f64,
}

impl Metrics {
    /// The record mandated for zero closed trades: all ratios null, risk Low,
    /// confidence zero.
    pub fn empty() -> Self {
        Metrics {
            sharpe: None,
            max_drawdown_pct: None,
            win_rate: None,
            total_trades: 0,
            profit_factor: None,
            avg_win: None,
            avg_loss: None,
            risk_label: RiskLabel::Low,
            confidence: 0.0,
            verdict: "Insufficient signals for analysis".to_string(),
            suggested_position_pct: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TrendDirection {
    Bullish,
    Bearish,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MomentumZone {
    Oversold,
    Neutral,
    Overbought,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VolRegime {
    Low,
    Normal,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MlPrediction {
    Long,
    Short,
    Flat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FilterState {
    Accelerating,
    Decelerating,
}

/// Category-tagged summary of the market posture at the last bar, consumed by
/// UI overlays. Serialized untagged; the enclosing record carries the tag in
/// its `output_type` field via [`StrategyOutput::kind`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StrategyOutput {
    Trend {
        direction: TrendDirection,
        strength_pct: Option<f64>,
        fast_value: Option<f64>,
        slow_value: Option<f64>,
    },
    Momentum {
        zone: MomentumZone,
        rsi_value: Option<f64>,
    },
    MeanReversion {
        distance_from_mean: Option<f64>,
        bandwidth_pct: Option<f64>,
        position: Option<f64>,
    },
    Volatility {
        regime: VolRegime,
        current_atr: Option<f64>,
        median_atr: Option<f64>,
        breakout_prob: Option<f64>,
    },
    Ml {
        prediction: MlPrediction,
        confidence_score: Option<f64>,
        features: BTreeMap<&'static str, Option<f64>>,
    },
    Statistical {
        filter_state: FilterState,
        estimated_price: Option<f64>,
        velocity: Option<f64>,
        gain: Option<f64>,
    },
    Generic {
        net_direction: TrendDirection,
        total_signals: usize,
    },
}

impl StrategyOutput {
    pub fn kind(&self) -> &'static str {
        match self {
            StrategyOutput::Trend { .. } => "trend",
            StrategyOutput::Momentum { .. } => "momentum",
            StrategyOutput::MeanReversion { .. } => "mean_reversion",
            StrategyOutput::Volatility { .. } => "volatility",
            StrategyOutput::Ml { .. } => "ml",
            StrategyOutput::Statistical { .. } => "statistical",
            StrategyOutput::Generic { .. } => "generic",
        }
    }
}

/// Action recorded in the backtest trade log. `Close` marks the forced exit
/// of a position still open at the last bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeAction {
    Buy,
    Sell,
    Close,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub ts: i64,
    pub action: TradeAction,
    pub price: f64,
    pub quantity: u64,
    pub pnl: f64,
    pub cumulative_pnl: f64,
}

/// One mark-to-market point on the equity curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub ts: i64,
    pub value: f64,
    pub cash: f64,
    pub position_value: f64,
}

/// Capital-constrained simulation result. `equity_curve` has one point per
/// input bar.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestReport {
    pub metrics: Metrics,
    pub initial_capital: f64,
    pub final_value: f64,
    pub total_return_pct: f64,
    pub equity_curve: Vec<EquityPoint>,
    pub trade_log: Vec<TradeRecord>,
}

/// Latest quote snapshot from the market-data provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub ticker: String,
    pub price: f64,
    pub previous_close: Option<f64>,
    pub day_high: Option<f64>,
    pub day_low: Option<f64>,
    pub volume: Option<f64>,
    pub ts: i64,
}

fn is_false(v: &bool) -> bool {
    !v
}

/// One narrated progress record in the stream orchestrator. Exactly one event
/// per stream carries `final = true`; it is always the last.
#[derive(Debug, Clone, Serialize)]
pub struct StepEvent {
    pub step: u32,
    pub total: u32,
    pub title: String,
    pub detail: String,
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indicator: Option<IndicatorSeries>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signals: Option<Vec<Signal>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Metrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indicator_data: Option<IndicatorSeries>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<StrategyOutput>,
    #[serde(rename = "final", skip_serializing_if = "is_false")]
    pub is_final: bool,
}

impl StepEvent {
    pub fn new(
        step: u32,
        total: u32,
        title: impl Into<String>,
        detail: impl Into<String>,
        progress: u8,
    ) -> Self {
        StepEvent {
            step,
            total,
            title: title.into(),
            detail: detail.into(),
            progress,
            indicator: None,
            signals: None,
            metrics: None,
            indicator_data: None,
            output_type: None,
            output: None,
            is_final: false,
        }
    }
}
