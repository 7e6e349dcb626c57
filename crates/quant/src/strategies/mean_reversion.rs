//! Mean-reversion strategies.

use common::ParamValue::{Float, Int};
use common::{finite, Bar, Category, IndicatorSeries, Side, StrategyOutput};

use crate::indicators::roll::rolling_std;
use crate::indicators::{bollinger, closes, sma, vwap, zscore};
use crate::params::Params;
use crate::signals::{crosses_above_level, crosses_below_level, SignalTape};

use super::{last_value, Artifacts, StrategyDef};

pub(super) fn defs() -> Vec<StrategyDef> {
    vec![
        StrategyDef {
            key: "bollinger_reversion",
            display_name: "Bollinger Bands Reversion",
            category: Category::MeanReversion,
            description: "Fades touches of the outer Bollinger bands.",
            defaults: &[("period", Int(20)), ("std_dev", Float(2.0))],
            validate: Some(validate_std_dev),
            run: bollinger_reversion,
        },
        StrategyDef {
            key: "zscore_reversion",
            display_name: "Z-Score Reversion",
            category: Category::MeanReversion,
            description: "Enters when the z-score reverses back from a stretched extreme.",
            defaults: &[("period", Int(20)), ("entry_z", Float(2.0))],
            validate: Some(validate_entry_z),
            run: zscore_reversion,
        },
        StrategyDef {
            key: "vwap_reversion",
            display_name: "VWAP Reversion",
            category: Category::MeanReversion,
            description: "Trades the snap-back through VWAP after a stretched deviation.",
            defaults: &[("deviation_pct", Float(2.0))],
            validate: Some(validate_deviation),
            run: vwap_reversion,
        },
    ]
}

fn validate_std_dev(params: &Params) -> Result<(), String> {
    let k = params.float("std_dev", 2.0);
    if k <= 0.0 {
        return Err(format!("std_dev must be positive, got {k}"));
    }
    Ok(())
}

fn validate_entry_z(params: &Params) -> Result<(), String> {
    let z = params.float("entry_z", 2.0);
    if z <= 0.0 {
        return Err(format!("entry_z must be positive, got {z}"));
    }
    Ok(())
}

fn validate_deviation(params: &Params) -> Result<(), String> {
    let dev = params.float("deviation_pct", 2.0);
    if dev <= 0.0 {
        return Err(format!("deviation_pct must be positive, got {dev}"));
    }
    Ok(())
}

pub(crate) fn bollinger_reversion(bars: &[Bar], params: &Params) -> Artifacts {
    let series = closes(bars);
    let period = params.window("period", 20);
    let std_dev = params.float("std_dev", 2.0);
    let (mid, upper, lower) = bollinger(&series, period, std_dev);

    let mut tape = SignalTape::new();
    for i in 1..bars.len() {
        let touch_low = lower[i].is_finite()
            && lower[i - 1].is_finite()
            && series[i] <= lower[i]
            && series[i - 1] > lower[i - 1];
        let touch_high = upper[i].is_finite()
            && upper[i - 1].is_finite()
            && series[i] >= upper[i]
            && series[i - 1] < upper[i - 1];
        if touch_low {
            tape.push(&bars[i], Side::Buy);
        } else if touch_high {
            tape.push(&bars[i], Side::Sell);
        }
    }

    let output = band_output(&series, &mid, &upper, &lower);
    let mut indicators = IndicatorSeries::new();
    indicators.insert("bb_upper", upper);
    indicators.insert("bb_middle", mid);
    indicators.insert("bb_lower", lower);
    Artifacts {
        signals: tape.into_signals(),
        indicators,
        output,
    }
}

pub(crate) fn zscore_reversion(bars: &[Bar], params: &Params) -> Artifacts {
    let series = closes(bars);
    let period = params.window("period", 20);
    let entry_z = params.float("entry_z", 2.0).abs();
    let z = zscore(&series, period);

    let mut tape = SignalTape::new();
    for i in 1..bars.len() {
        // Reversal back through the stretched threshold, not the touch itself.
        if crosses_above_level(&z, -entry_z, i) {
            tape.push(&bars[i], Side::Buy);
        } else if crosses_below_level(&z, entry_z, i) {
            tape.push(&bars[i], Side::Sell);
        }
    }

    let mean = sma(&series, period);
    let std = rolling_std(&series, period);
    let output = zscore_output(&z, &mean, &std, entry_z);
    Artifacts {
        signals: tape.into_signals(),
        indicators: IndicatorSeries::single("zscore", z),
        output,
    }
}

pub(crate) fn vwap_reversion(bars: &[Bar], params: &Params) -> Artifacts {
    let vwap_ch = vwap(bars);
    let dev = params.float("deviation_pct", 2.0) / 100.0;

    let mut tape = SignalTape::new();
    let mut stretched_below = false;
    let mut stretched_above = false;
    for (i, bar) in bars.iter().enumerate() {
        let v = vwap_ch[i];
        if !v.is_finite() {
            continue;
        }
        if bar.close < v * (1.0 - dev) {
            stretched_below = true;
        } else if bar.close > v * (1.0 + dev) {
            stretched_above = true;
        }
        if stretched_below && bar.close > v {
            tape.push(bar, Side::Buy);
            stretched_below = false;
        } else if stretched_above && bar.close < v {
            tape.push(bar, Side::Sell);
            stretched_above = false;
        }
    }

    let output = vwap_output(bars, &vwap_ch, dev);
    Artifacts {
        signals: tape.into_signals(),
        indicators: IndicatorSeries::single("vwap", vwap_ch),
        output,
    }
}

fn band_output(series: &[f64], mid: &[f64], upper: &[f64], lower: &[f64]) -> StrategyOutput {
    let c = last_value(series);
    let m = last_value(mid);
    let u = last_value(upper);
    let l = last_value(lower);

    let distance_from_mean = match (c, m, u) {
        (Some(c), Some(m), Some(u)) if u > m => Some(((c - m) / (u - m)).clamp(-1.0, 1.0)),
        _ => None,
    };
    let bandwidth_pct = match (m, u, l) {
        (Some(m), Some(u), Some(l)) if m != 0.0 => finite((u - l) / m * 100.0),
        _ => None,
    };
    let position = match (c, u, l) {
        (Some(c), Some(u), Some(l)) if u > l => Some(((c - l) / (u - l)).clamp(0.0, 1.0)),
        _ => None,
    };

    StrategyOutput::MeanReversion {
        distance_from_mean,
        bandwidth_pct,
        position,
    }
}

fn zscore_output(z: &[f64], mean: &[f64], std: &[f64], entry_z: f64) -> StrategyOutput {
    let distance_from_mean = last_value(z).map(|v| (v / entry_z).clamp(-1.0, 1.0));
    let bandwidth_pct = match (last_value(mean), last_value(std)) {
        (Some(m), Some(s)) if m != 0.0 => finite(2.0 * entry_z * s / m * 100.0),
        _ => None,
    };
    StrategyOutput::MeanReversion {
        distance_from_mean,
        bandwidth_pct,
        position: distance_from_mean.map(|d| (d + 1.0) / 2.0),
    }
}

fn vwap_output(bars: &[Bar], vwap_ch: &[f64], dev: f64) -> StrategyOutput {
    let c = bars.last().map(|b| b.close).filter(|c| c.is_finite());
    let v = last_value(vwap_ch);
    let distance_from_mean = match (c, v) {
        (Some(c), Some(v)) if v != 0.0 && dev > 0.0 => {
            Some(((c - v) / (v * dev)).clamp(-1.0, 1.0))
        }
        _ => None,
    };
    StrategyOutput::MeanReversion {
        distance_from_mean,
        bandwidth_pct: finite(2.0 * dev * 100.0),
        position: distance_from_mean.map(|d| (d + 1.0) / 2.0),
    }
}
