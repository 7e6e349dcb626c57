//! Volatility breakout strategies.

use common::ParamValue::{Float, Int};
use common::{Bar, Category, IndicatorSeries, Side, StrategyOutput, VolRegime};

use crate::indicators::roll::median;
use crate::indicators::{atr, keltner};
use crate::params::Params;
use crate::signals::SignalTape;

use super::{last_value, Artifacts, StrategyDef};

pub(super) fn defs() -> Vec<StrategyDef> {
    vec![
        StrategyDef {
            key: "atr_breakout",
            display_name: "ATR Breakout",
            category: Category::Volatility,
            description: "Signals when a bar travels more than a multiple of ATR from the prior close.",
            defaults: &[("period", Int(14)), ("multiplier", Float(1.5))],
            validate: Some(validate_multiplier),
            run: atr_breakout,
        },
        StrategyDef {
            key: "keltner_channel",
            display_name: "Keltner Channel",
            category: Category::Volatility,
            description: "Trades closes outside the EMA/ATR channel.",
            defaults: &[
                ("ema_period", Int(20)),
                ("atr_period", Int(14)),
                ("multiplier", Float(2.0)),
            ],
            validate: Some(validate_multiplier),
            run: keltner_channel,
        },
    ]
}

fn validate_multiplier(params: &Params) -> Result<(), String> {
    let mult = params.float("multiplier", 1.0);
    if mult <= 0.0 {
        return Err(format!("multiplier must be positive, got {mult}"));
    }
    Ok(())
}

pub(crate) fn atr_breakout(bars: &[Bar], params: &Params) -> Artifacts {
    let period = params.window("period", 14);
    let mult = params.float("multiplier", 1.5);
    let atr_ch = atr(bars, period);

    // Channel anchored at the prior bar keeps the rule causal.
    let n = bars.len();
    let mut upper = vec![f64::NAN; n];
    let mut lower = vec![f64::NAN; n];
    let mut tape = SignalTape::new();
    for i in 1..n {
        let prev_close = bars[i - 1].close;
        if !atr_ch[i - 1].is_finite() || !prev_close.is_finite() {
            continue;
        }
        upper[i] = prev_close + mult * atr_ch[i - 1];
        lower[i] = prev_close - mult * atr_ch[i - 1];
        if bars[i].close > upper[i] {
            tape.push(&bars[i], Side::Buy);
        } else if bars[i].close < lower[i] {
            tape.push(&bars[i], Side::Sell);
        }
    }

    let output = volatility_output(&atr_ch);
    let mut indicators = IndicatorSeries::new();
    indicators.insert("atr", atr_ch);
    indicators.insert("atr_upper", upper);
    indicators.insert("atr_lower", lower);
    Artifacts {
        signals: tape.into_signals(),
        indicators,
        output,
    }
}

pub(crate) fn keltner_channel(bars: &[Bar], params: &Params) -> Artifacts {
    let ema_period = params.window("ema_period", 20);
    let atr_period = params.window("atr_period", 14);
    let mult = params.float("multiplier", 2.0);
    let (mid, upper, lower) = keltner(bars, ema_period, atr_period, mult);

    let mut tape = SignalTape::new();
    for (i, bar) in bars.iter().enumerate() {
        if upper[i].is_finite() && bar.close > upper[i] {
            tape.push(bar, Side::Buy);
        } else if lower[i].is_finite() && bar.close < lower[i] {
            tape.push(bar, Side::Sell);
        }
    }

    let output = volatility_output(&atr(bars, atr_period));
    let mut indicators = IndicatorSeries::new();
    indicators.insert("keltner_ema", mid);
    indicators.insert("keltner_upper", upper);
    indicators.insert("keltner_lower", lower);
    Artifacts {
        signals: tape.into_signals(),
        indicators,
        output,
    }
}

/// Regime classification of the latest ATR against its own median.
pub(crate) fn volatility_output(atr_ch: &[f64]) -> StrategyOutput {
    let current = last_value(atr_ch);
    let med = common::finite(median(atr_ch)).filter(|m| *m > 0.0);

    let regime = match (current, med) {
        (Some(c), Some(m)) if c > 1.5 * m => VolRegime::High,
        (Some(c), Some(m)) if c < 0.7 * m => VolRegime::Low,
        (Some(_), Some(_)) => VolRegime::Normal,
        _ => VolRegime::Normal,
    };
    let breakout_prob = match (current, med) {
        (Some(c), Some(m)) => Some((c / m).min(1.0)),
        _ => None,
    };

    StrategyOutput::Volatility {
        regime,
        current_atr: current,
        median_atr: med,
        breakout_prob,
    }
}
