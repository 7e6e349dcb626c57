use super::sma;

/// Volume relative to its own rolling average: volume / SMA(volume, n).
/// Bars whose reference average is a hole (or zero) stay holes; a spike is a
/// ratio above the caller's multiplier.
pub fn volume_ratio(volumes: &[f64], lookback: usize) -> Vec<f64> {
    let avg = sma(volumes, lookback);
    volumes
        .iter()
        .enumerate()
        .map(|(i, v)| {
            if avg[i].is_nan() || avg[i] <= 0.0 || v.is_nan() {
                f64::NAN
            } else {
                v / avg[i]
            }
        })
        .collect()
}
