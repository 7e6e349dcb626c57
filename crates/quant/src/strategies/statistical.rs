//! Statistical filter strategies.

use common::ParamValue::{Float, Int};
use common::{finite, Bar, Category, FilterState, IndicatorSeries, Side, StrategyOutput};

use crate::indicators::{closes, kalman_1d, regime};
use crate::params::Params;
use crate::signals::{crosses_above_level, crosses_below_level, SignalTape};

use super::{generic_output, last_value, Artifacts, StrategyDef};

pub(super) fn defs() -> Vec<StrategyDef> {
    vec![
        StrategyDef {
            key: "kalman_filter",
            display_name: "Kalman Filter Trend",
            category: Category::Statistical,
            description: "Adaptive price filter; trades zero-crossings of the filtered velocity.",
            defaults: &[
                ("process_noise", Float(0.01)),
                ("measurement_noise", Float(1.0)),
            ],
            validate: Some(validate_noise),
            run: kalman_filter,
        },
        StrategyDef {
            key: "hmm_regime",
            display_name: "Markov Regime Detection",
            category: Category::Statistical,
            description: "Two-state regime from rolling mean returns; trades regime entries.",
            defaults: &[("lookback", Int(30))],
            validate: None,
            run: hmm_regime,
        },
    ]
}

fn validate_noise(params: &Params) -> Result<(), String> {
    let q = params.float("process_noise", 0.01);
    let r = params.float("measurement_noise", 1.0);
    if q <= 0.0 || r <= 0.0 {
        return Err(format!(
            "process_noise ({q}) and measurement_noise ({r}) must be positive"
        ));
    }
    Ok(())
}

pub(crate) fn kalman_filter(bars: &[Bar], params: &Params) -> Artifacts {
    let series = closes(bars);
    let out = kalman_1d(
        &series,
        params.float("process_noise", 0.01),
        params.float("measurement_noise", 1.0),
    );

    let mut tape = SignalTape::new();
    for i in 1..bars.len() {
        if crosses_above_level(&out.velocity, 0.0, i) {
            tape.push(&bars[i], Side::Buy);
        } else if crosses_below_level(&out.velocity, 0.0, i) {
            tape.push(&bars[i], Side::Sell);
        }
    }

    let n = out.velocity.len();
    let filter_state = if n >= 2
        && out.velocity[n - 1].is_finite()
        && out.velocity[n - 2].is_finite()
        && out.velocity[n - 1] > out.velocity[n - 2]
    {
        FilterState::Accelerating
    } else {
        FilterState::Decelerating
    };
    let output = StrategyOutput::Statistical {
        filter_state,
        estimated_price: last_value(&out.filtered),
        velocity: last_value(&out.velocity),
        gain: finite(out.gain),
    };

    let mut indicators = IndicatorSeries::new();
    indicators.insert("kalman", out.filtered);
    indicators.insert("kalman_velocity", out.velocity);
    Artifacts {
        signals: tape.into_signals(),
        indicators,
        output,
    }
}

pub(crate) fn hmm_regime(bars: &[Bar], params: &Params) -> Artifacts {
    let series = closes(bars);
    let (regimes, mean_ret) = regime(&series, params.window("lookback", 30));

    let mut tape = SignalTape::new();
    for i in 1..bars.len() {
        if regimes[i] == 1.0 && regimes[i - 1] == -1.0 {
            tape.push_labeled(&bars[i], Side::Buy, Some("Bullish regime entry".to_string()));
        } else if regimes[i] == -1.0 && regimes[i - 1] == 1.0 {
            tape.push_labeled(&bars[i], Side::Sell, Some("Bearish regime entry".to_string()));
        }
    }

    let signals = tape.into_signals();
    let output = generic_output(&signals);
    let mut indicators = IndicatorSeries::new();
    indicators.insert("regime", regimes);
    indicators.insert("mean_return", mean_ret);
    Artifacts {
        signals,
        indicators,
        output,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{flat_bars, make_bars};

    fn run_default(key: &str, bars: &[Bar]) -> Artifacts {
        let registry = super::super::StrategyRegistry::new();
        let def = registry.get(key).unwrap();
        let params = Params::resolve(def.defaults, &serde_json::Map::new()).unwrap();
        (def.run)(bars, &params)
    }

    #[test]
    fn kalman_buys_when_velocity_turns_positive() {
        let mut closes: Vec<f64> = (0..20).map(|i| 100.0 - i as f64).collect();
        closes.extend((0..20).map(|i| 81.0 + i as f64 * 2.0));
        let art = run_default("kalman_filter", &make_bars(&closes));
        let buys: Vec<_> = art.signals.iter().filter(|s| s.side == Side::Buy).collect();
        assert!(!buys.is_empty());
        match &art.output {
            StrategyOutput::Statistical { estimated_price, gain, .. } => {
                assert!(estimated_price.is_some());
                let g = gain.unwrap();
                assert!(g > 0.0 && g < 1.0);
            }
            other => panic!("unexpected output: {other:?}"),
        }
    }

    #[test]
    fn kalman_is_silent_on_flat_bars() {
        let art = run_default("kalman_filter", &flat_bars(30, 40.0));
        assert!(art.signals.is_empty());
    }

    #[test]
    fn regime_shift_emits_labeled_entries() {
        let mut closes: Vec<f64> = (0..25).map(|i| 100.0 + i as f64).collect();
        closes.extend((0..25).map(|i| 124.0 - i as f64 * 2.0));
        let registry = super::super::StrategyRegistry::new();
        let def = registry.get("hmm_regime").unwrap();
        let params = Params::resolve(
            def.defaults,
            &serde_json::from_str(r#"{"lookback": 5}"#).unwrap(),
        )
        .unwrap();
        let art = (def.run)(&make_bars(&closes), &params);

        assert!(!art.signals.is_empty());
        let sell = art.signals.iter().find(|s| s.side == Side::Sell).unwrap();
        assert_eq!(sell.label.as_deref(), Some("Bearish regime entry"));
    }
}
