//! Momentum oscillator strategies.

use common::ParamValue::{Float, Int};
use common::{Bar, Category, IndicatorSeries, MomentumZone, Side, StrategyOutput};

use crate::indicators::{cci, closes, roc, rsi, stochastic};
use crate::params::Params;
use crate::signals::{
    crosses_above, crosses_above_level, crosses_below, crosses_below_level, SignalTape,
};

use super::{last_value, Artifacts, StrategyDef};

pub(super) fn defs() -> Vec<StrategyDef> {
    vec![
        StrategyDef {
            key: "rsi_strategy",
            display_name: "RSI Strategy",
            category: Category::Momentum,
            description: "Buys when RSI recovers through oversold, sells when it drops through overbought.",
            defaults: &[
                ("period", Int(14)),
                ("oversold", Float(30.0)),
                ("overbought", Float(70.0)),
            ],
            validate: Some(validate_zones),
            run: rsi_strategy,
        },
        StrategyDef {
            key: "stochastic",
            display_name: "Stochastic Oscillator",
            category: Category::Momentum,
            description: "%K/%D crossovers taken inside the oversold and overbought zones.",
            defaults: &[
                ("k_period", Int(14)),
                ("d_period", Int(3)),
                ("oversold", Float(20.0)),
                ("overbought", Float(80.0)),
            ],
            validate: Some(validate_zones),
            run: stochastic_strategy,
        },
        StrategyDef {
            key: "roc_strategy",
            display_name: "Rate of Change",
            category: Category::Momentum,
            description: "Signals on the rate of change flipping sign across its threshold.",
            defaults: &[("period", Int(12)), ("threshold", Float(0.0))],
            validate: None,
            run: roc_strategy,
        },
        StrategyDef {
            key: "cci_strategy",
            display_name: "Commodity Channel Index",
            category: Category::Momentum,
            description: "Buys CCI recoveries through -100, sells breaks through +100.",
            defaults: &[
                ("period", Int(20)),
                ("oversold", Float(-100.0)),
                ("overbought", Float(100.0)),
            ],
            validate: Some(validate_zones),
            run: cci_strategy,
        },
    ]
}

fn validate_zones(params: &Params) -> Result<(), String> {
    let oversold = params.float("oversold", 0.0);
    let overbought = params.float("overbought", 0.0);
    if oversold >= overbought {
        return Err(format!(
            "oversold ({oversold}) must be below overbought ({overbought})"
        ));
    }
    Ok(())
}

pub(crate) fn rsi_strategy(bars: &[Bar], params: &Params) -> Artifacts {
    let series = closes(bars);
    let rsi_ch = rsi(&series, params.window("period", 14));
    let oversold = params.float("oversold", 30.0);
    let overbought = params.float("overbought", 70.0);

    let mut tape = SignalTape::new();
    for i in 1..bars.len() {
        if crosses_above_level(&rsi_ch, oversold, i) {
            tape.push(&bars[i], Side::Buy);
        } else if crosses_below_level(&rsi_ch, overbought, i) {
            tape.push(&bars[i], Side::Sell);
        }
    }

    let output = momentum_output(&rsi_ch, oversold, overbought);
    Artifacts {
        signals: tape.into_signals(),
        indicators: IndicatorSeries::single("rsi", rsi_ch),
        output,
    }
}

pub(crate) fn stochastic_strategy(bars: &[Bar], params: &Params) -> Artifacts {
    let (k, d) = stochastic(
        bars,
        params.window("k_period", 14),
        params.window("d_period", 3),
    );
    let oversold = params.float("oversold", 20.0);
    let overbought = params.float("overbought", 80.0);

    let mut tape = SignalTape::new();
    for i in 1..bars.len() {
        if crosses_above(&k, &d, i) && k[i - 1].is_finite() && k[i - 1] < oversold {
            tape.push(&bars[i], Side::Buy);
        } else if crosses_below(&k, &d, i) && k[i - 1].is_finite() && k[i - 1] > overbought {
            tape.push(&bars[i], Side::Sell);
        }
    }

    let output = momentum_output(&k, oversold, overbought);
    let mut indicators = IndicatorSeries::new();
    indicators.insert("stoch_k", k);
    indicators.insert("stoch_d", d);
    Artifacts {
        signals: tape.into_signals(),
        indicators,
        output,
    }
}

pub(crate) fn roc_strategy(bars: &[Bar], params: &Params) -> Artifacts {
    let series = closes(bars);
    let roc_ch = roc(&series, params.window("period", 12));
    let threshold = params.float("threshold", 0.0);

    let mut tape = SignalTape::new();
    for i in 1..bars.len() {
        if crosses_above_level(&roc_ch, threshold, i) {
            tape.push(&bars[i], Side::Buy);
        } else if crosses_below_level(&roc_ch, threshold, i) {
            tape.push(&bars[i], Side::Sell);
        }
    }

    // ROC has no canonical bands; +-10% serves as the zone marker.
    let output = momentum_output(&roc_ch, -10.0, 10.0);
    Artifacts {
        signals: tape.into_signals(),
        indicators: IndicatorSeries::single("roc", roc_ch),
        output,
    }
}

pub(crate) fn cci_strategy(bars: &[Bar], params: &Params) -> Artifacts {
    let cci_ch = cci(bars, params.window("period", 20));
    let oversold = params.float("oversold", -100.0);
    let overbought = params.float("overbought", 100.0);

    let mut tape = SignalTape::new();
    for i in 1..bars.len() {
        if crosses_above_level(&cci_ch, oversold, i) {
            tape.push(&bars[i], Side::Buy);
        } else if crosses_below_level(&cci_ch, overbought, i) {
            tape.push(&bars[i], Side::Sell);
        }
    }

    let output = momentum_output(&cci_ch, oversold, overbought);
    Artifacts {
        signals: tape.into_signals(),
        indicators: IndicatorSeries::single("cci", cci_ch),
        output,
    }
}

/// Zone classification for an oscillator against its thresholds.
pub(crate) fn momentum_output(oscillator: &[f64], oversold: f64, overbought: f64) -> StrategyOutput {
    let value = last_value(oscillator);
    let zone = match value {
        Some(v) if v <= oversold => MomentumZone::Oversold,
        Some(v) if v >= overbought => MomentumZone::Overbought,
        _ => MomentumZone::Neutral,
    };
    StrategyOutput::Momentum {
        zone,
        rsi_value: value,
    }
}
