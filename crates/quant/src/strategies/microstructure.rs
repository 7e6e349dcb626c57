//! Price-action proxies for market microstructure effects.

use common::ParamValue::{Float, Int};
use common::{Bar, Category, IndicatorSeries, Side};

use crate::indicators::{sma, volume_ratio, volumes};
use crate::params::Params;
use crate::signals::{crosses_above_level, crosses_below_level, SignalTape};

use super::{generic_output, Artifacts, StrategyDef};

pub(super) fn defs() -> Vec<StrategyDef> {
    vec![
        StrategyDef {
            key: "volume_spike",
            display_name: "Volume Spike Detection",
            category: Category::MarketMicrostructure,
            description: "Flags abnormal volume and takes the direction of the bar that carried it.",
            defaults: &[("lookback", Int(20)), ("threshold", Float(2.0))],
            validate: Some(validate_spike_threshold),
            run: volume_spike,
        },
        StrategyDef {
            key: "order_imbalance",
            display_name: "Order Imbalance Detection",
            category: Category::MarketMicrostructure,
            description: "Thresholded crossings of smoothed intra-bar buy/sell pressure.",
            defaults: &[("lookback", Int(10)), ("threshold", Float(0.6))],
            validate: Some(validate_imbalance_threshold),
            run: order_imbalance,
        },
    ]
}

fn validate_spike_threshold(params: &Params) -> Result<(), String> {
    let threshold = params.float("threshold", 2.0);
    if threshold <= 1.0 {
        return Err(format!(
            "threshold must exceed 1.0 (its own average), got {threshold}"
        ));
    }
    Ok(())
}

fn validate_imbalance_threshold(params: &Params) -> Result<(), String> {
    let threshold = params.float("threshold", 0.6);
    if !(0.0..1.0).contains(&threshold) || threshold == 0.0 {
        return Err(format!(
            "threshold must be inside (0, 1), got {threshold}"
        ));
    }
    Ok(())
}

pub(crate) fn volume_spike(bars: &[Bar], params: &Params) -> Artifacts {
    let ratio = volume_ratio(&volumes(bars), params.window("lookback", 20));
    let threshold = params.float("threshold", 2.0);

    let mut tape = SignalTape::new();
    for i in 1..bars.len() {
        if !ratio[i].is_finite() || ratio[i] <= threshold {
            continue;
        }
        let label = Some(format!("Volume {:.1}x average", ratio[i]));
        if bars[i].close > bars[i - 1].close {
            tape.push_labeled(&bars[i], Side::Buy, label);
        } else if bars[i].close < bars[i - 1].close {
            tape.push_labeled(&bars[i], Side::Sell, label);
        }
    }

    let signals = tape.into_signals();
    let output = generic_output(&signals);
    Artifacts {
        signals,
        indicators: IndicatorSeries::single("volume_ratio", ratio),
        output,
    }
}

pub(crate) fn order_imbalance(bars: &[Bar], params: &Params) -> Artifacts {
    // Pressure proxy in [-1, 1]: where the close sits inside the bar's range.
    let raw: Vec<f64> = bars
        .iter()
        .map(|b| {
            let range = b.high - b.low;
            if !range.is_finite() || range <= 0.0 {
                f64::NAN
            } else {
                ((b.close - b.low) - (b.high - b.close)) / range
            }
        })
        .collect();
    let smoothed = sma(&raw, params.window("lookback", 10));
    let threshold = params.float("threshold", 0.6);

    let mut tape = SignalTape::new();
    for i in 1..bars.len() {
        if crosses_above_level(&smoothed, threshold, i) {
            tape.push(&bars[i], Side::Buy);
        } else if crosses_below_level(&smoothed, -threshold, i) {
            tape.push(&bars[i], Side::Sell);
        }
    }

    let signals = tape.into_signals();
    let output = generic_output(&signals);
    Artifacts {
        signals,
        indicators: IndicatorSeries::single("imbalance", smoothed),
        output,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{flat_bars, make_bars};
    use common::StrategyOutput;

    fn run_default(key: &str, bars: &[Bar]) -> Artifacts {
        let registry = super::super::StrategyRegistry::new();
        let def = registry.get(key).unwrap();
        let params = Params::resolve(def.defaults, &serde_json::Map::new()).unwrap();
        (def.run)(bars, &params)
    }

    #[test]
    fn volume_spike_labels_the_magnitude() {
        let mut bars = make_bars(&(0..30).map(|i| 100.0 + i as f64 * 0.1).collect::<Vec<_>>());
        bars[25].volume = 10_000.0; // 10x the steady 1000
        let art = run_default("volume_spike", &bars);
        assert_eq!(art.signals.len(), 1);
        assert_eq!(art.signals[0].side, Side::Buy);
        let label = art.signals[0].label.as_deref().unwrap();
        assert!(label.starts_with("Volume"), "unexpected label: {label}");
    }

    #[test]
    fn spike_on_a_down_bar_sells() {
        let mut closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64 * 0.1).collect();
        closes[25] = 95.0;
        let mut bars = make_bars(&closes);
        bars[25].volume = 10_000.0;
        let art = run_default("volume_spike", &bars);
        assert_eq!(art.signals.first().map(|s| s.side), Some(Side::Sell));
    }

    #[test]
    fn flat_bars_are_silent_and_generic_output_is_neutral() {
        for key in ["volume_spike", "order_imbalance"] {
            let art = run_default(key, &flat_bars(30, 10.0));
            assert!(art.signals.is_empty());
            match art.output {
                StrategyOutput::Generic { total_signals, .. } => assert_eq!(total_signals, 0),
                other => panic!("unexpected output: {other:?}"),
            }
        }
    }

    #[test]
    fn sustained_pressure_crossing_fires_imbalance() {
        // Closes pinned to the highs push the smoothed pressure through +0.6.
        let mut bars = make_bars(&(0..30).map(|_| 100.0).collect::<Vec<_>>());
        for (i, bar) in bars.iter_mut().enumerate() {
            bar.low = 95.0;
            bar.high = 105.0;
            bar.close = if i < 15 { 100.0 } else { 104.9 };
            bar.open = 100.0;
        }
        let art = run_default("order_imbalance", &bars);
        assert_eq!(art.signals.first().map(|s| s.side), Some(Side::Buy));
    }
}
