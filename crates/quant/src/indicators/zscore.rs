use super::roll::rolling_std;
use super::sma;

/// Rolling z-score of price against its own mean: (x - SMA(n)) / stdev(n).
/// Zero variance leaves a hole, never ±∞.
pub fn zscore(values: &[f64], period: usize) -> Vec<f64> {
    let mean = sma(values, period);
    let std = rolling_std(values, period);

    values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            if std[i].is_nan() || std[i] <= 0.0 {
                f64::NAN
            } else {
                (v - mean[i]) / std[i]
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_series_is_guarded() {
        let out = zscore(&[7.0; 30], 20);
        assert!(out.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn outlier_scores_high() {
        let mut values = vec![100.0; 25];
        values.push(130.0);
        let out = zscore(&values, 20);
        let last = *out.last().unwrap();
        assert!(last > 3.0, "outlier z-score should be large, got {last}");
    }
}
