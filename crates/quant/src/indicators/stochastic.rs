use common::Bar;

use super::roll::{rolling_max, rolling_min};
use super::sma;

/// Stochastic oscillator: %K = 100 * (close - low_k) / (high_k - low_k),
/// %D = SMA(d) of %K. A zero high-low range leaves a hole rather than a
/// division artifact.
pub fn stochastic(bars: &[Bar], k_period: usize, d_period: usize) -> (Vec<f64>, Vec<f64>) {
    let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();

    let high_k = rolling_max(&highs, k_period);
    let low_k = rolling_min(&lows, k_period);

    let k: Vec<f64> = bars
        .iter()
        .enumerate()
        .map(|(i, b)| {
            let range = high_k[i] - low_k[i];
            if range.is_nan() || range <= 0.0 {
                f64::NAN
            } else {
                100.0 * (b.close - low_k[i]) / range
            }
        })
        .collect();

    let d = sma(&k, d_period);
    (k, d)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{flat_bars, make_bars};

    #[test]
    fn percent_k_stays_in_range() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + (i as f64 * 0.7).sin() * 10.0).collect();
        let bars = make_bars(&closes);
        let (k, d) = stochastic(&bars, 14, 3);
        assert_eq!(k.len(), 30);
        assert_eq!(d.len(), 30);
        for v in k.iter().filter(|v| v.is_finite()) {
            assert!((0.0..=100.0).contains(v));
        }
    }

    #[test]
    fn zero_range_is_guarded() {
        let (k, d) = stochastic(&flat_bars(20, 10.0), 14, 3);
        assert!(k.iter().all(|v| v.is_nan()));
        assert!(d.iter().all(|v| v.is_nan()));
    }
}
