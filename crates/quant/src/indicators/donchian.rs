use common::Bar;

use super::roll::{rolling_max, rolling_min};

/// Donchian channel: (upper, lower, middle) where upper/lower are the rolling
/// extreme of highs/lows over `period` and middle is their midpoint.
pub fn donchian(bars: &[Bar], period: usize) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();

    let upper = rolling_max(&highs, period);
    let lower = rolling_min(&lows, period);
    let middle: Vec<f64> = upper.iter().zip(&lower).map(|(u, l)| (u + l) / 2.0).collect();
    (upper, lower, middle)
}
