use super::ema;

/// MACD line, signal line, and histogram.
///
/// macd = EMA(fast) - EMA(slow); signal = EMA(macd, signal_period) seeded
/// over the first valid MACD values; hist = macd - signal. All three channels
/// are bar-aligned with NaN holes where undefined.
pub fn macd(
    closes: &[f64],
    fast: usize,
    slow: usize,
    signal_period: usize,
) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let fast_e = ema(closes, fast);
    let slow_e = ema(closes, slow);

    let macd_line: Vec<f64> = fast_e
        .iter()
        .zip(&slow_e)
        .map(|(f, s)| f - s)
        .collect();

    let signal_line = ema(&macd_line, signal_period);
    let hist: Vec<f64> = macd_line
        .iter()
        .zip(&signal_line)
        .map(|(m, s)| m - s)
        .collect();

    (macd_line, signal_line, hist)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    #[test]
    fn channels_are_bar_aligned() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64 * 0.3).sin()).collect();
        let (m, s, h) = macd(&closes, 12, 26, 9);
        assert_eq!(m.len(), 60);
        assert_eq!(s.len(), 60);
        assert_eq!(h.len(), 60);
    }

    #[test]
    fn macd_defined_from_slow_seed_signal_later() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let (m, s, _) = macd(&closes, 12, 26, 9);
        assert!(m[24].is_nan());
        assert!(m[25].is_finite());
        // signal needs 9 valid macd values: 25 + 8
        assert!(s[32].is_nan());
        assert!(s[33].is_finite());
    }

    #[test]
    fn constant_series_gives_zero_macd() {
        let closes = vec![50.0; 50];
        let (m, _, h) = macd(&closes, 5, 10, 3);
        assert_approx(m[30], 0.0, DEFAULT_EPSILON);
        assert_approx(h[30], 0.0, DEFAULT_EPSILON);
    }
}
