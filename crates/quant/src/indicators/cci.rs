use common::Bar;

use super::roll::rolling_mad;
use super::sma;

/// Commodity Channel Index over the typical price:
/// (tp - SMA(tp, n)) / (0.015 * mean absolute deviation). A zero deviation
/// leaves a hole.
pub fn cci(bars: &[Bar], period: usize) -> Vec<f64> {
    let tp: Vec<f64> = bars.iter().map(|b| (b.high + b.low + b.close) / 3.0).collect();
    let mean = sma(&tp, period);
    let mad = rolling_mad(&tp, period);

    tp.iter()
        .enumerate()
        .map(|(i, v)| {
            if mad[i].is_nan() || mad[i] <= 0.0 {
                f64::NAN
            } else {
                (v - mean[i]) / (0.015 * mad[i])
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{flat_bars, make_bars};

    #[test]
    fn flat_bars_are_guarded() {
        let out = cci(&flat_bars(25, 10.0), 20);
        assert!(out.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn strong_upmove_pushes_cci_positive() {
        let mut closes = vec![100.0; 20];
        closes.extend([101.0, 103.0, 106.0, 110.0]);
        let bars = make_bars(&closes);
        let out = cci(&bars, 20);
        assert!(*out.last().unwrap() > 100.0);
    }
}
