//! The fixed strategy catalog.
//!
//! Each entry couples stable metadata (key, category, defaults) with a pure
//! runner producing signals, overlay channels, and a posture summary. The
//! registry is built once at startup and read concurrently by every worker.

pub mod mean_reversion;
pub mod microstructure;
pub mod ml;
pub mod momentum;
pub mod statistical;
pub mod trend;
pub mod volatility;

use std::collections::BTreeMap;

use common::{
    Bar, Category, IndicatorSeries, ParamValue, Side, Signal, StrategyDescriptor, StrategyOutput,
    TrendDirection,
};

use crate::params::Params;

/// What one strategy run produces before scoring: the signal tape, the
/// overlay channels, and the posture summary at the last bar.
#[derive(Debug, Clone)]
pub struct Artifacts {
    pub signals: Vec<Signal>,
    pub indicators: IndicatorSeries,
    pub output: StrategyOutput,
}

pub type RunFn = fn(&[Bar], &Params) -> Artifacts;
pub type ValidateFn = fn(&Params) -> Result<(), String>;

/// One catalog entry. Renaming a key is a breaking change.
pub struct StrategyDef {
    pub key: &'static str,
    pub display_name: &'static str,
    pub category: Category,
    pub description: &'static str,
    pub defaults: &'static [(&'static str, ParamValue)],
    pub validate: Option<ValidateFn>,
    pub run: RunFn,
}

impl StrategyDef {
    pub fn descriptor(&self) -> StrategyDescriptor {
        StrategyDescriptor {
            key: self.key,
            display_name: self.display_name,
            category: self.category,
            description: self.description,
            default_params: self.defaults.iter().copied().collect::<BTreeMap<_, _>>(),
        }
    }
}

/// Process-wide strategy catalog, immutable after construction.
pub struct StrategyRegistry {
    defs: Vec<StrategyDef>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        let mut defs = Vec::new();
        defs.extend(trend::defs());
        defs.extend(momentum::defs());
        defs.extend(mean_reversion::defs());
        defs.extend(volatility::defs());
        defs.extend(microstructure::defs());
        defs.extend(statistical::defs());
        defs.extend(ml::defs());
        Self { defs }
    }

    pub fn get(&self, key: &str) -> Option<&StrategyDef> {
        self.defs.iter().find(|d| d.key == key)
    }

    pub fn descriptors(&self) -> Vec<StrategyDescriptor> {
        self.defs.iter().map(StrategyDef::descriptor).collect()
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.defs.iter().map(|d| d.key)
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Last channel value if the series ends on a defined position.
pub(crate) fn last_value(series: &[f64]) -> Option<f64> {
    series.last().copied().filter(|v| v.is_finite())
}

/// Posture summary for strategies without a dedicated category payload.
pub(crate) fn generic_output(signals: &[Signal]) -> StrategyOutput {
    let buys = signals.iter().filter(|s| s.side == Side::Buy).count();
    let sells = signals.iter().filter(|s| s.side == Side::Sell).count();
    let net_direction = match buys.cmp(&sells) {
        std::cmp::Ordering::Greater => TrendDirection::Bullish,
        std::cmp::Ordering::Less => TrendDirection::Bearish,
        std::cmp::Ordering::Equal => TrendDirection::Neutral,
    };
    StrategyOutput::Generic {
        net_direction,
        total_signals: signals.len(),
    }
}
