use super::roll::rolling_std;
use super::sma;

/// Bollinger Bands: (middle, upper, lower) where middle = SMA(period) and
/// the bands sit `k` sample standard deviations away.
pub fn bollinger(closes: &[f64], period: usize, k: f64) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let mid = sma(closes, period);
    let std = rolling_std(closes, period);

    let upper: Vec<f64> = mid.iter().zip(&std).map(|(m, s)| m + k * s).collect();
    let lower: Vec<f64> = mid.iter().zip(&std).map(|(m, s)| m - k * s).collect();
    (mid, upper, lower)
}
