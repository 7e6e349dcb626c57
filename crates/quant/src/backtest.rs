//! Capital-constrained replay of a signal set.
//!
//! Long-only simulation at bar close: a BUY converts a fraction of available
//! cash into whole units, a SELL liquidates, and a position still open at the
//! last bar is force-closed into the trade log (equity already reflects the
//! mark-to-market value).

use common::{
    BacktestReport, Bar, EquityPoint, Interval, Metrics, Side, Signal, TradeAction, TradeRecord,
};

use crate::metrics::{
    confidence_score, risk_label, suggested_position_pct, verdict, PROFIT_FACTOR_CAP,
};

/// Fraction of available cash deployed on each entry.
pub const DEFAULT_SIZE_FRACTION: f64 = 0.95;

pub fn run_backtest(
    bars: &[Bar],
    signals: &[Signal],
    interval: Interval,
    initial_capital: f64,
    size_fraction: f64,
) -> BacktestReport {
    let mut cash = initial_capital;
    let mut holdings: u64 = 0;
    let mut entry_price = 0.0;
    let mut cumulative_pnl = 0.0;

    let mut equity_curve = Vec::with_capacity(bars.len());
    let mut trade_log = Vec::new();

    let mut pending = signals.iter().peekable();

    for bar in bars {
        // All signals anchored to this bar execute at its close.
        while let Some(signal) = pending.peek() {
            if signal.ts != bar.ts {
                if signal.ts < bar.ts {
                    pending.next();
                    continue;
                }
                break;
            }
            match signal.side {
                Side::Buy if holdings == 0 && cash > 0.0 && bar.close > 0.0 => {
                    let quantity = (size_fraction * cash / bar.close).floor() as u64;
                    if quantity > 0 {
                        cash -= quantity as f64 * bar.close;
                        holdings = quantity;
                        entry_price = bar.close;
                        trade_log.push(TradeRecord {
                            ts: bar.ts,
                            action: TradeAction::Buy,
                            price: bar.close,
                            quantity,
                            pnl: 0.0,
                            cumulative_pnl,
                        });
                    }
                }
                Side::Sell if holdings > 0 => {
                    let pnl = (bar.close - entry_price) * holdings as f64;
                    cumulative_pnl += pnl;
                    cash += holdings as f64 * bar.close;
                    trade_log.push(TradeRecord {
                        ts: bar.ts,
                        action: TradeAction::Sell,
                        price: bar.close,
                        quantity: holdings,
                        pnl,
                        cumulative_pnl,
                    });
                    holdings = 0;
                    entry_price = 0.0;
                }
                _ => {}
            }
            pending.next();
        }

        equity_curve.push(EquityPoint {
            ts: bar.ts,
            value: cash + holdings as f64 * bar.close,
            cash,
            position_value: holdings as f64 * bar.close,
        });
    }

    // Force-close anything still held so the trade log balances.
    if holdings > 0 {
        if let Some(last) = bars.last() {
            let pnl = (last.close - entry_price) * holdings as f64;
            cumulative_pnl += pnl;
            cash += holdings as f64 * last.close;
            trade_log.push(TradeRecord {
                ts: last.ts,
                action: TradeAction::Close,
                price: last.close,
                quantity: holdings,
                pnl,
                cumulative_pnl,
            });
        }
    }

    let final_value = equity_curve.last().map(|p| p.value).unwrap_or(initial_capital);
    let total_return_pct = if initial_capital > 0.0 {
        (final_value - initial_capital) / initial_capital * 100.0
    } else {
        0.0
    };

    let metrics = backtest_metrics(&equity_curve, &trade_log, interval);

    BacktestReport {
        metrics,
        initial_capital,
        final_value,
        total_return_pct,
        equity_curve,
        trade_log,
    }
}

/// Metrics recomputed on the realized equity curve and trade log rather than
/// the raw signal stream.
fn backtest_metrics(
    equity_curve: &[EquityPoint],
    trade_log: &[TradeRecord],
    interval: Interval,
) -> Metrics {
    let closes: Vec<&TradeRecord> = trade_log
        .iter()
        .filter(|t| matches!(t.action, TradeAction::Sell | TradeAction::Close))
        .collect();
    if closes.is_empty() || equity_curve.len() < 2 {
        return Metrics::empty();
    }

    let wins: Vec<f64> = closes.iter().map(|t| t.pnl).filter(|p| *p > 0.0).collect();
    let losses: Vec<f64> = closes.iter().map(|t| t.pnl).filter(|p| *p < 0.0).collect();
    let decided = wins.len() + losses.len();
    let win_rate = (decided > 0).then(|| wins.len() as f64 / decided as f64);
    let avg_win = (!wins.is_empty()).then(|| wins.iter().sum::<f64>() / wins.len() as f64);
    let avg_loss =
        (!losses.is_empty()).then(|| (losses.iter().sum::<f64>() / losses.len() as f64).abs());

    let sum_wins: f64 = wins.iter().sum();
    let sum_losses: f64 = losses.iter().map(|l| l.abs()).sum();
    let profit_factor = if sum_losses > 0.0 {
        Some(sum_wins / sum_losses)
    } else if sum_wins > 0.0 {
        Some(PROFIT_FACTOR_CAP)
    } else {
        None
    };

    let mut returns = Vec::with_capacity(equity_curve.len() - 1);
    for pair in equity_curve.windows(2) {
        if pair[0].value > 0.0 {
            returns.push(pair[1].value / pair[0].value - 1.0);
        }
    }
    let sharpe = {
        let n = returns.len() as f64;
        if n > 0.0 {
            let mean = returns.iter().sum::<f64>() / n;
            let var = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
            let std = var.sqrt();
            (std > 0.0).then(|| mean / std * interval.bars_per_year().sqrt())
        } else {
            None
        }
    };

    let mut peak = f64::MIN;
    let mut max_dd = 0.0f64;
    for point in equity_curve {
        if point.value > peak {
            peak = point.value;
        }
        if peak > 0.0 {
            max_dd = max_dd.max((peak - point.value) / peak);
        }
    }
    let max_dd_pct = max_dd * 100.0;

    let confidence = confidence_score(closes.len(), win_rate, profit_factor);

    Metrics {
        sharpe,
        max_drawdown_pct: Some(max_dd_pct),
        win_rate,
        total_trades: closes.len() as u32,
        profit_factor,
        avg_win,
        avg_loss,
        risk_label: risk_label(max_dd_pct, closes.len()),
        confidence,
        verdict: verdict(sharpe, confidence),
        suggested_position_pct: suggested_position_pct(win_rate),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    fn sig(bars: &[Bar], idx: usize, side: Side) -> Signal {
        Signal {
            ts: bars[idx].ts,
            side,
            price: bars[idx].close,
            label: None,
        }
    }

    #[test]
    fn zero_signals_is_a_flat_curve() {
        let bars = make_bars(&[10.0, 11.0, 9.0, 12.0]);
        let report = run_backtest(&bars, &[], Interval::D1, 100_000.0, DEFAULT_SIZE_FRACTION);
        assert_eq!(report.final_value, 100_000.0);
        assert_eq!(report.total_return_pct, 0.0);
        assert!(report.trade_log.is_empty());
        assert_eq!(report.equity_curve.len(), 4);
        assert!(report.equity_curve.iter().all(|p| p.value == 100_000.0));
        assert_eq!(report.metrics, Metrics::empty());
    }

    #[test]
    fn full_round_trip_books_the_move() {
        let bars = make_bars(&[10.0, 10.0, 12.0, 12.0]);
        let signals = vec![sig(&bars, 1, Side::Buy), sig(&bars, 2, Side::Sell)];
        let report = run_backtest(&bars, &signals, Interval::D1, 10_000.0, 1.0);

        // 1000 units at 10, sold at 12
        assert_eq!(report.trade_log.len(), 2);
        assert_eq!(report.trade_log[0].action, TradeAction::Buy);
        assert_eq!(report.trade_log[0].quantity, 1000);
        assert_eq!(report.trade_log[1].action, TradeAction::Sell);
        assert_eq!(report.trade_log[1].pnl, 2000.0);
        assert_eq!(report.final_value, 12_000.0);
        assert_eq!(report.metrics.total_trades, 1);
    }

    #[test]
    fn open_position_is_force_closed_at_the_end() {
        let bars = make_bars(&[10.0, 10.0, 15.0]);
        let signals = vec![sig(&bars, 1, Side::Buy)];
        let report = run_backtest(&bars, &signals, Interval::D1, 1_000.0, 1.0);

        let last = report.trade_log.last().unwrap();
        assert_eq!(last.action, TradeAction::Close);
        assert_eq!(last.pnl, 500.0);
        // equity already carried the mark-to-market value
        assert_eq!(report.equity_curve.last().unwrap().value, 1_500.0);
        assert_eq!(report.final_value, 1_500.0);
    }

    #[test]
    fn sell_without_holdings_is_a_no_op() {
        let bars = make_bars(&[10.0, 9.0, 8.0]);
        let signals = vec![sig(&bars, 1, Side::Sell)];
        let report = run_backtest(&bars, &signals, Interval::D1, 5_000.0, 1.0);
        assert!(report.trade_log.is_empty());
        assert_eq!(report.final_value, 5_000.0);
    }

    #[test]
    fn size_fraction_limits_deployment() {
        let bars = make_bars(&[100.0, 100.0, 100.0]);
        let signals = vec![sig(&bars, 1, Side::Buy)];
        let report = run_backtest(&bars, &signals, Interval::D1, 10_000.0, 0.5);
        assert_eq!(report.trade_log[0].quantity, 50);
        let point = &report.equity_curve[1];
        assert_eq!(point.position_value, 5_000.0);
        assert_eq!(point.cash, 5_000.0);
    }

    #[test]
    fn equity_curve_len_always_matches_bars() {
        let bars = make_bars(&[10.0, 11.0, 12.0, 11.0, 10.0, 12.0]);
        let signals = vec![sig(&bars, 1, Side::Buy), sig(&bars, 4, Side::Sell)];
        let report = run_backtest(&bars, &signals, Interval::D1, 10_000.0, 1.0);
        assert_eq!(report.equity_curve.len(), bars.len());
    }
}
