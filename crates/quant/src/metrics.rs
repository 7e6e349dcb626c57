//! Performance scoring for a signal set against its close series.

use common::{Bar, Interval, Metrics, RiskLabel, Side, Signal};

/// Serialized stand-in for an unbounded profit factor (all wins, no losses).
pub const PROFIT_FACTOR_CAP: f64 = 999.0;

/// A closed round trip: BUY opens, the next SELL closes. A position still
/// open after the last signal is closed at the final bar for accounting.
#[derive(Debug, Clone, Copy)]
struct ClosedTrade {
    open_idx: usize,
    close_idx: usize,
    pnl: f64,
}

/// Score a signal set. Zero closed trades yields the canonical empty record
/// (all ratios null, risk Low, confidence 0).
pub fn compute_metrics(bars: &[Bar], signals: &[Signal], interval: Interval) -> Metrics {
    let trades = pair_trades(bars, signals);
    if trades.is_empty() || bars.len() < 2 {
        return Metrics::empty();
    }

    let wins: Vec<f64> = trades.iter().map(|t| t.pnl).filter(|p| *p > 0.0).collect();
    let losses: Vec<f64> = trades.iter().map(|t| t.pnl).filter(|p| *p < 0.0).collect();

    // Zero-PnL trades count toward the total but are neither wins nor losses.
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

    // Per-bar strategy returns: close-to-close while long, zero otherwise.
    let returns = strategy_returns(bars, &trades);
    let sharpe = annualized_sharpe(&returns[1..], interval);
    let max_dd = max_drawdown_pct(&returns);

    let risk_label = risk_label(max_dd, trades.len());
    let confidence = confidence_score(trades.len(), win_rate, profit_factor);
    let verdict = verdict(sharpe, confidence);

    Metrics {
        sharpe,
        max_drawdown_pct: Some(max_dd),
        win_rate,
        total_trades: trades.len() as u32,
        profit_factor,
        avg_win,
        avg_loss,
        risk_label,
        confidence,
        verdict,
        suggested_position_pct: suggested_position_pct(win_rate),
    }
}

/// Pair signals into closed trades. Leading SELLs (no open long) are
/// skipped; a trailing open long closes at the last bar.
fn pair_trades(bars: &[Bar], signals: &[Signal]) -> Vec<ClosedTrade> {
    let mut trades = Vec::new();
    let mut open: Option<(usize, f64)> = None;

    for signal in signals {
        let Some(idx) = bar_index(bars, signal.ts) else {
            continue;
        };
        match (signal.side, open) {
            (Side::Buy, None) => open = Some((idx, signal.price)),
            (Side::Sell, Some((open_idx, open_price))) => {
                trades.push(ClosedTrade {
                    open_idx,
                    close_idx: idx,
                    pnl: signal.price - open_price,
                });
                open = None;
            }
            _ => {}
        }
    }

    if let (Some((open_idx, open_price)), Some(last)) = (open, bars.last()) {
        trades.push(ClosedTrade {
            open_idx,
            close_idx: bars.len() - 1,
            pnl: last.close - open_price,
        });
    }
    trades
}

fn bar_index(bars: &[Bar], ts: i64) -> Option<usize> {
    bars.binary_search_by_key(&ts, |b| b.ts).ok()
}

fn strategy_returns(bars: &[Bar], trades: &[ClosedTrade]) -> Vec<f64> {
    let mut returns = vec![0.0; bars.len()];
    for trade in trades {
        for i in trade.open_idx + 1..=trade.close_idx {
            let prev = bars[i - 1].close;
            if prev.is_finite() && prev != 0.0 && bars[i].close.is_finite() {
                returns[i] = bars[i].close / prev - 1.0;
            }
        }
    }
    returns
}

fn annualized_sharpe(returns: &[f64], interval: Interval) -> Option<f64> {
    if returns.is_empty() {
        return None;
    }
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let var = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let std = var.sqrt();
    if std <= 0.0 || !std.is_finite() {
        return None;
    }
    Some(mean / std * interval.bars_per_year().sqrt())
}

/// Peak-to-trough drawdown in percent on the compounded strategy equity path.
fn max_drawdown_pct(returns: &[f64]) -> f64 {
    let mut equity = 1.0;
    let mut peak = 1.0;
    let mut max_dd = 0.0;
    for r in returns {
        equity *= 1.0 + r;
        if equity > peak {
            peak = equity;
        }
        let dd = (peak - equity) / peak;
        if dd > max_dd {
            max_dd = dd;
        }
    }
    max_dd * 100.0
}

pub(crate) fn risk_label(max_dd_pct: f64, trade_count: usize) -> RiskLabel {
    if max_dd_pct <= 5.0 && trade_count >= 10 {
        RiskLabel::Low
    } else if max_dd_pct <= 15.0 {
        RiskLabel::Moderate
    } else {
        RiskLabel::High
    }
}

/// Bounded score in [0, 1]: sample size fills 0.4, win rate above coin-flip
/// fills 0.35, profit factor above break-even fills 0.25.
pub(crate) fn confidence_score(
    trade_count: usize,
    win_rate: Option<f64>,
    profit_factor: Option<f64>,
) -> f64 {
    let size = trade_count.min(10) as f64 / 10.0;
    let wr = win_rate
        .map(|w| ((w - 0.5) * 2.0).clamp(0.0, 1.0))
        .unwrap_or(0.0);
    let pf = profit_factor
        .map(|p| ((p - 1.0) / 2.0).clamp(0.0, 1.0))
        .unwrap_or(0.0);
    (0.4 * size + 0.35 * wr + 0.25 * pf).clamp(0.0, 1.0)
}

pub(crate) fn verdict(sharpe: Option<f64>, confidence: f64) -> String {
    match sharpe {
        Some(s) if s > 0.0 && confidence >= 0.6 => {
            "Positive risk-adjusted edge with consistent signal quality.".to_string()
        }
        Some(s) if s > 0.0 => {
            "Positive risk-adjusted edge, but the sample is thin.".to_string()
        }
        Some(_) if confidence >= 0.6 => {
            "No risk-adjusted edge despite an ample sample; treat signals as noise.".to_string()
        }
        Some(_) => "No risk-adjusted edge detected.".to_string(),
        None => "Return variance too low to score risk-adjusted performance.".to_string(),
    }
}

pub(crate) fn suggested_position_pct(win_rate: Option<f64>) -> f64 {
    match win_rate {
        Some(w) => ((w * 30.0) as i64).clamp(2, 25) as f64,
        None => 2.0,
    }
}
