use common::Bar;

use super::atr;

/// SuperTrend line and direction.
///
/// Basic bands are hl2 ± mult * ATR(period). Direction flips to +1 when the
/// close breaches the prior upper band, to -1 on the prior lower band, and
/// carries otherwise. The line rides the lower band while long and the upper
/// band while short. Direction is encoded as ±1.0 with NaN before the bands
/// form.
pub fn supertrend(bars: &[Bar], period: usize, mult: f64) -> (Vec<f64>, Vec<f64>) {
    let n = bars.len();
    let atr_ch = atr(bars, period);

    let mut upper = vec![f64::NAN; n];
    let mut lower = vec![f64::NAN; n];
    for i in 0..n {
        let hl2 = (bars[i].high + bars[i].low) / 2.0;
        upper[i] = hl2 + mult * atr_ch[i];
        lower[i] = hl2 - mult * atr_ch[i];
    }

    let mut line = vec![f64::NAN; n];
    let mut direction = vec![f64::NAN; n];
    for i in 1..n {
        if upper[i - 1].is_nan() || upper[i].is_nan() {
            continue;
        }
        let prev_dir = if direction[i - 1].is_nan() {
            1.0
        } else {
            direction[i - 1]
        };
        direction[i] = if bars[i].close > upper[i - 1] {
            1.0
        } else if bars[i].close < lower[i - 1] {
            -1.0
        } else {
            prev_dir
        };
        line[i] = if direction[i] > 0.0 { lower[i] } else { upper[i] };
    }

    (line, direction)
}
