use common::Bar;

use super::{atr, ema};

/// Keltner channel: EMA midline with ATR bands.
/// (middle, upper, lower) = (EMA(ema_period), mid ± mult * ATR(atr_period)).
pub fn keltner(
    bars: &[Bar],
    ema_period: usize,
    atr_period: usize,
    mult: f64,
) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let mid = ema(&closes, ema_period);
    let atr_ch = atr(bars, atr_period);

    let upper: Vec<f64> = mid.iter().zip(&atr_ch).map(|(m, a)| m + mult * a).collect();
    let lower: Vec<f64> = mid.iter().zip(&atr_ch).map(|(m, a)| m - mult * a).collect();
    (mid, upper, lower)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    #[test]
    fn bands_open_where_both_components_exist() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + (i as f64 * 0.5).cos() * 3.0).collect();
        let bars = make_bars(&closes);
        let (mid, upper, lower) = keltner(&bars, 20, 14, 2.0);
        assert_eq!(upper.len(), 40);
        // EMA defined at 19, ATR at 14; both from 19 on
        assert!(upper[18].is_nan());
        for i in 19..40 {
            assert!(mid[i].is_finite());
            assert!(upper[i] >= mid[i]);
            assert!(lower[i] <= mid[i]);
        }
    }
}
