use proptest::prelude::*;

use common::{Bar, Interval, Side};
use quant::{run_strategy, StrategyRegistry};

fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                ts: 1_700_000_000 + i as i64 * 86_400,
                open,
                high: open.max(close) * 1.01,
                low: open.min(close) * 0.99,
                close,
                volume: 1_000.0 + (i % 7) as f64 * 250.0,
            }
        })
        .collect()
}

fn random_walk(start: f64, steps: &[f64]) -> Vec<f64> {
    let mut closes = Vec::with_capacity(steps.len() + 1);
    let mut price = start;
    closes.push(price);
    for step in steps {
        price = (price * (1.0 + step / 100.0)).max(1.0);
        closes.push(price);
    }
    closes
}

fn assert_no_non_finite(value: &serde_json::Value, context: &str) {
    match value {
        serde_json::Value::Number(n) => {
            assert!(
                n.as_f64().map(f64::is_finite).unwrap_or(true),
                "non-finite number leaked in {context}"
            );
        }
        serde_json::Value::Array(items) => {
            items.iter().for_each(|v| assert_no_non_finite(v, context))
        }
        serde_json::Value::Object(map) => {
            map.values().for_each(|v| assert_no_non_finite(v, context))
        }
        _ => {}
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// For every strategy on any random walk: signals alternate (the open
    /// position bounds the buy/sell imbalance by one), channels stay
    /// bar-aligned, and every serialized number is finite.
    #[test]
    fn universal_invariants_hold_on_random_walks(
        start in 20.0f64..500.0,
        steps in proptest::collection::vec(-4.0f64..4.0, 40..140),
    ) {
        let closes = random_walk(start, &steps);
        let bars = bars_from_closes(&closes);
        let registry = StrategyRegistry::new();

        for key in registry.keys() {
            let run = run_strategy(&registry, key, &bars, Interval::D1, &serde_json::Map::new())
                .unwrap_or_else(|e| panic!("'{key}' failed: {e}"));

            // Alternation modulo one open position
            let buys = run.signals.iter().filter(|s| s.side == Side::Buy).count() as i64;
            let sells = run.signals.len() as i64 - buys;
            prop_assert!(
                (buys - sells).abs() <= 1,
                "'{}' broke alternation: {} buys vs {} sells", key, buys, sells
            );
            for pair in run.signals.windows(2) {
                prop_assert!(pair[0].side != pair[1].side, "'{}' emitted same-side run", key);
                prop_assert!(pair[0].ts < pair[1].ts, "'{}' signals out of order", key);
            }

            // Signals reference timestamps present in the input series
            for signal in &run.signals {
                prop_assert!(
                    bars.iter().any(|b| b.ts == signal.ts),
                    "'{}' anchored a signal off-series", key
                );
            }

            // Channel alignment
            for (name, channel) in run.indicator_data.channels() {
                prop_assert_eq!(channel.len(), bars.len(), "'{}' channel '{}' misaligned", key, name);
            }

            // Finite-float serialization
            let payload = serde_json::json!({
                "signals": run.signals,
                "metrics": run.metrics,
                "indicator_data": run.indicator_data,
                "output": run.output,
            });
            let text = serde_json::to_string(&payload).unwrap();
            let reparsed: serde_json::Value = serde_json::from_str(&text).unwrap();
            assert_no_non_finite(&reparsed, key);

            // Metrics domain checks
            prop_assert!((0.0..=1.0).contains(&run.metrics.confidence));
            if let Some(w) = run.metrics.win_rate {
                prop_assert!((0.0..=1.0).contains(&w));
            }
        }
    }

    /// The metric engine's trade count matches the backtest's closed-trade
    /// count on identical inputs, given ample capital.
    #[test]
    fn metrics_and_backtest_agree_on_trade_count(
        start in 50.0f64..200.0,
        steps in proptest::collection::vec(-3.0f64..3.0, 50..120),
    ) {
        let closes = random_walk(start, &steps);
        let bars = bars_from_closes(&closes);
        let registry = StrategyRegistry::new();

        for key in ["ma_crossover", "rsi_strategy", "bollinger_reversion", "kalman_filter"] {
            let run = run_strategy(&registry, key, &bars, Interval::D1, &serde_json::Map::new())
                .unwrap();
            let report = quant::run_backtest(&bars, &run.signals, Interval::D1, 1_000_000.0, 1.0);

            let closed = report
                .trade_log
                .iter()
                .filter(|t| matches!(t.action, common::TradeAction::Sell | common::TradeAction::Close))
                .count() as u32;
            prop_assert_eq!(
                run.metrics.total_trades, closed,
                "'{}' trade counts diverged", key
            );
            prop_assert_eq!(report.equity_curve.len(), bars.len());
        }
    }
}
