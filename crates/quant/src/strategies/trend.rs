//! Trend-following strategies.

use common::ParamValue::{Float, Int};
use common::{Bar, Category, IndicatorSeries, Side, StrategyOutput, TrendDirection};

use crate::indicators::{closes, donchian, ema, macd, sma, supertrend};
use crate::params::Params;
use crate::signals::{crosses_above, crosses_below, SignalTape};

use super::{last_value, Artifacts, StrategyDef};

pub(super) fn defs() -> Vec<StrategyDef> {
    vec![
        StrategyDef {
            key: "ma_crossover",
            display_name: "Moving Average Crossover",
            category: Category::Trend,
            description: "Signals when the fast SMA crosses above or below the slow SMA.",
            defaults: &[("fast_period", Int(10)), ("slow_period", Int(30))],
            validate: Some(validate_fast_slow_periods),
            run: ma_crossover,
        },
        StrategyDef {
            key: "ema_strategy",
            display_name: "EMA Strategy",
            category: Category::Trend,
            description: "Exponential MA crossover with faster response to price changes.",
            defaults: &[("fast_period", Int(9)), ("slow_period", Int(21))],
            validate: Some(validate_fast_slow_periods),
            run: ema_strategy,
        },
        StrategyDef {
            key: "macd_signal",
            display_name: "MACD Signal",
            category: Category::Trend,
            description: "MACD/signal-line crossovers taken only on the far side of zero.",
            defaults: &[("fast", Int(12)), ("slow", Int(26)), ("signal", Int(9))],
            validate: Some(validate_fast_slow),
            run: macd_signal,
        },
        StrategyDef {
            key: "supertrend",
            display_name: "Supertrend",
            category: Category::Trend,
            description: "ATR-banded trend line; signals on direction flips.",
            defaults: &[("period", Int(10)), ("multiplier", Float(3.0))],
            validate: Some(validate_multiplier),
            run: supertrend_strategy,
        },
        StrategyDef {
            key: "donchian_breakout",
            display_name: "Donchian Channel Breakout",
            category: Category::Trend,
            description: "Signals when the close breaches the prior channel extremes.",
            defaults: &[("period", Int(20))],
            validate: None,
            run: donchian_breakout,
        },
    ]
}

fn validate_fast_slow_periods(params: &Params) -> Result<(), String> {
    let fast = params.window("fast_period", 1);
    let slow = params.window("slow_period", 1);
    if slow <= fast {
        return Err(format!(
            "slow_period ({slow}) must be greater than fast_period ({fast})"
        ));
    }
    Ok(())
}

fn validate_fast_slow(params: &Params) -> Result<(), String> {
    let fast = params.window("fast", 1);
    let slow = params.window("slow", 1);
    if slow <= fast {
        return Err(format!("slow ({slow}) must be greater than fast ({fast})"));
    }
    Ok(())
}

fn validate_multiplier(params: &Params) -> Result<(), String> {
    let mult = params.float("multiplier", 1.0);
    if mult <= 0.0 {
        return Err(format!("multiplier must be positive, got {mult}"));
    }
    Ok(())
}

pub(crate) fn ma_crossover(bars: &[Bar], params: &Params) -> Artifacts {
    let series = closes(bars);
    let fast = sma(&series, params.window("fast_period", 10));
    let slow = sma(&series, params.window("slow_period", 30));
    crossover_artifacts(bars, fast, slow, "fast_sma", "slow_sma")
}

pub(crate) fn ema_strategy(bars: &[Bar], params: &Params) -> Artifacts {
    let series = closes(bars);
    let fast = ema(&series, params.window("fast_period", 9));
    let slow = ema(&series, params.window("slow_period", 21));
    crossover_artifacts(bars, fast, slow, "fast_ema", "slow_ema")
}

fn crossover_artifacts(
    bars: &[Bar],
    fast: Vec<f64>,
    slow: Vec<f64>,
    fast_name: &'static str,
    slow_name: &'static str,
) -> Artifacts {
    let mut tape = SignalTape::new();
    for i in 1..bars.len() {
        if crosses_above(&fast, &slow, i) {
            tape.push(&bars[i], Side::Buy);
        } else if crosses_below(&fast, &slow, i) {
            tape.push(&bars[i], Side::Sell);
        }
    }

    let output = trend_output(bars, &fast, &slow);
    let mut indicators = IndicatorSeries::new();
    indicators.insert(fast_name, fast);
    indicators.insert(slow_name, slow);
    Artifacts {
        signals: tape.into_signals(),
        indicators,
        output,
    }
}

pub(crate) fn macd_signal(bars: &[Bar], params: &Params) -> Artifacts {
    let series = closes(bars);
    let (macd_line, signal_line, hist) = macd(
        &series,
        params.window("fast", 12),
        params.window("slow", 26),
        params.window("signal", 9),
    );

    let mut tape = SignalTape::new();
    for i in 1..bars.len() {
        if crosses_above(&macd_line, &signal_line, i)
            && macd_line[i] < 0.0
            && signal_line[i] < 0.0
        {
            tape.push(&bars[i], Side::Buy);
        } else if crosses_below(&macd_line, &signal_line, i)
            && macd_line[i] > 0.0
            && signal_line[i] > 0.0
        {
            tape.push(&bars[i], Side::Sell);
        }
    }

    let output = trend_output(bars, &macd_line, &signal_line);
    let mut indicators = IndicatorSeries::new();
    indicators.insert("macd", macd_line);
    indicators.insert("signal", signal_line);
    indicators.insert("histogram", hist);
    Artifacts {
        signals: tape.into_signals(),
        indicators,
        output,
    }
}

pub(crate) fn supertrend_strategy(bars: &[Bar], params: &Params) -> Artifacts {
    let (line, direction) = supertrend(
        bars,
        params.window("period", 10),
        params.float("multiplier", 3.0),
    );

    let mut tape = SignalTape::new();
    for i in 1..bars.len() {
        if direction[i] == 1.0 && direction[i - 1] == -1.0 {
            tape.push(&bars[i], Side::Buy);
        } else if direction[i] == -1.0 && direction[i - 1] == 1.0 {
            tape.push(&bars[i], Side::Sell);
        }
    }

    let series = closes(bars);
    let output = trend_output(bars, &series, &line);
    let mut indicators = IndicatorSeries::new();
    indicators.insert("supertrend", line);
    indicators.insert("direction", direction);
    Artifacts {
        signals: tape.into_signals(),
        indicators,
        output,
    }
}

pub(crate) fn donchian_breakout(bars: &[Bar], params: &Params) -> Artifacts {
    let (upper, lower, middle) = donchian(bars, params.window("period", 20));

    let mut tape = SignalTape::new();
    for i in 1..bars.len() {
        if upper[i - 1].is_finite() && bars[i].close > upper[i - 1] {
            tape.push(&bars[i], Side::Buy);
        } else if lower[i - 1].is_finite() && bars[i].close < lower[i - 1] {
            tape.push(&bars[i], Side::Sell);
        }
    }

    let series = closes(bars);
    let output = trend_output(bars, &series, &middle);
    let mut indicators = IndicatorSeries::new();
    indicators.insert("upper", upper);
    indicators.insert("lower", lower);
    indicators.insert("middle", middle);
    Artifacts {
        signals: tape.into_signals(),
        indicators,
        output,
    }
}

/// Trend posture from a fast line against a slow baseline.
pub(crate) fn trend_output(bars: &[Bar], fast: &[f64], slow: &[f64]) -> StrategyOutput {
    let f = last_value(fast);
    let s = last_value(slow);
    let close = bars.last().map(|b| b.close).filter(|c| c.is_finite());

    let direction = match (f, s) {
        (Some(f), Some(s)) if f > s => TrendDirection::Bullish,
        (Some(f), Some(s)) if f < s => TrendDirection::Bearish,
        _ => TrendDirection::Neutral,
    };
    let strength_pct = match (f, s, close) {
        (Some(f), Some(s), Some(c)) if c != 0.0 => common::finite((f - s).abs() / c * 100.0),
        _ => None,
    };

    StrategyOutput::Trend {
        direction,
        strength_pct,
        fast_value: f,
        slow_value: s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    fn run(key: &str, closes: &[f64]) -> Artifacts {
        let registry = super::super::StrategyRegistry::new();
        let def = registry.get(key).unwrap();
        let params = Params::resolve(def.defaults, &serde_json::Map::new()).unwrap();
        (def.run)(&make_bars(closes), &params)
    }

    #[test]
    fn ma_crossover_seed_scenario() {
        // Ramp up, break down, recover: expect BUY, SELL, BUY around the turns.
        let closes = [
            10.0, 11.0, 12.0, 13.0, 14.0, 10.0, 9.0, 8.0, 7.0, 6.0, 10.0, 12.0, 14.0, 16.0, 18.0,
        ];
        let registry = super::super::StrategyRegistry::new();
        let def = registry.get("ma_crossover").unwrap();
        let params = Params::resolve(
            def.defaults,
            &serde_json::from_str(r#"{"fast_period": 3, "slow_period": 5}"#).unwrap(),
        )
        .unwrap();
        let bars = make_bars(&closes);
        let art = (def.run)(&bars, &params);

        let sides: Vec<Side> = art.signals.iter().map(|s| s.side).collect();
        assert_eq!(sides, vec![Side::Buy, Side::Sell, Side::Buy]);

        let ts_to_idx = |ts: i64| bars.iter().position(|b| b.ts == ts).unwrap();
        let indices: Vec<usize> = art.signals.iter().map(|s| ts_to_idx(s.ts)).collect();
        assert!((3..=5).contains(&indices[0]), "first BUY near index 4, got {}", indices[0]);
        assert!((6..=8).contains(&indices[1]), "SELL near index 7, got {}", indices[1]);
        assert!((11..=13).contains(&indices[2]), "second BUY near index 12, got {}", indices[2]);
    }

    #[test]
    fn monotone_series_opens_at_most_one_long_and_never_sells() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let art = run("ma_crossover", &closes);
        // The fast line is on top from the first comparable bar; that single
        // opening BUY is the only permissible signal.
        assert!(art.signals.len() <= 1);
        assert!(art.signals.iter().all(|s| s.side == Side::Buy));
        match art.output {
            StrategyOutput::Trend { direction, .. } => {
                assert_eq!(direction, TrendDirection::Bullish)
            }
            other => panic!("unexpected output: {other:?}"),
        }
    }

    #[test]
    fn channels_match_bar_count() {
        let closes: Vec<f64> = (0..50).map(|i| 100.0 + (i as f64 * 0.4).sin() * 8.0).collect();
        for key in ["ma_crossover", "ema_strategy", "macd_signal", "supertrend", "donchian_breakout"] {
            let art = run(key, &closes);
            for (name, channel) in art.indicators.channels() {
                assert_eq!(channel.len(), 50, "channel '{name}' of '{key}' misaligned");
            }
        }
    }

    #[test]
    fn donchian_breaks_out_on_new_highs_after_a_base() {
        let mut closes = vec![100.0; 25];
        closes.extend([100.5, 101.0, 115.0]);
        let art = run("donchian_breakout", &closes);
        assert!(!art.signals.is_empty());
        assert_eq!(art.signals[0].side, Side::Buy);
    }
}
