/// Relative Strength Index with Wilder's smoothing.
///
/// Average gain/loss seed with the simple average over the first `period`
/// one-bar changes, so `out[i]` is NaN for `i < period`. Values are in
/// [0, 100]; a zero average loss with gains present pins the index at 100,
/// while the fully flat 0/0 case is a hole.
pub fn rsi(closes: &[f64], period: usize) -> Vec<f64> {
    let n = closes.len();
    let mut out = vec![f64::NAN; n];
    if period == 0 || n < period + 1 {
        return out;
    }

    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    for i in 1..=period {
        let change = closes[i] - closes[i - 1];
        if change > 0.0 {
            avg_gain += change;
        } else {
            avg_loss += -change;
        }
    }
    avg_gain /= period as f64;
    avg_loss /= period as f64;
    out[period] = level(avg_gain, avg_loss);

    for i in period + 1..n {
        let change = closes[i] - closes[i - 1];
        let gain = change.max(0.0);
        let loss = (-change).max(0.0);
        avg_gain = (avg_gain * (period - 1) as f64 + gain) / period as f64;
        avg_loss = (avg_loss * (period - 1) as f64 + loss) / period as f64;
        out[i] = level(avg_gain, avg_loss);
    }
    out
}

fn level(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_gain.is_nan() || avg_loss.is_nan() {
        return f64::NAN;
    }
    if avg_loss == 0.0 {
        // all-flat window: 0/0 is undefined, not maximally overbought
        return if avg_gain == 0.0 { f64::NAN } else { 100.0 };
    }
    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}
