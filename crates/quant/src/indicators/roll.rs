//! Rolling-window helpers shared by several indicators.

/// Rolling maximum over `period`. NaN while the window is unfilled or
/// contains a NaN.
pub fn rolling_max(values: &[f64], period: usize) -> Vec<f64> {
    rolling(values, period, |w| {
        w.iter().copied().fold(f64::MIN, f64::max)
    })
}

/// Rolling minimum over `period`.
pub fn rolling_min(values: &[f64], period: usize) -> Vec<f64> {
    rolling(values, period, |w| {
        w.iter().copied().fold(f64::MAX, f64::min)
    })
}

/// Rolling sample standard deviation over `period` (requires period >= 2).
pub fn rolling_std(values: &[f64], period: usize) -> Vec<f64> {
    if period < 2 {
        return vec![f64::NAN; values.len()];
    }
    rolling(values, period, |w| {
        let mean = w.iter().sum::<f64>() / w.len() as f64;
        let var = w.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (w.len() as f64 - 1.0);
        var.sqrt()
    })
}

/// Rolling mean absolute deviation over `period`.
pub fn rolling_mad(values: &[f64], period: usize) -> Vec<f64> {
    rolling(values, period, |w| {
        let mean = w.iter().sum::<f64>() / w.len() as f64;
        w.iter().map(|v| (v - mean).abs()).sum::<f64>() / w.len() as f64
    })
}

/// Median of the finite values in a series. NaN when none are finite.
pub fn median(values: &[f64]) -> f64 {
    let mut finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return f64::NAN;
    }
    finite.sort_by(|a, b| a.partial_cmp(b).expect("finite values compare"));
    let mid = finite.len() / 2;
    if finite.len() % 2 == 0 {
        (finite[mid - 1] + finite[mid]) / 2.0
    } else {
        finite[mid]
    }
}

fn rolling(values: &[f64], period: usize, f: impl Fn(&[f64]) -> f64) -> Vec<f64> {
    let n = values.len();
    let mut out = vec![f64::NAN; n];
    if period == 0 || n < period {
        return out;
    }
    for i in period - 1..n {
        let window = &values[i + 1 - period..=i];
        if window.iter().any(|v| v.is_nan()) {
            continue;
        }
        out[i] = f(window);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    #[test]
    fn rolling_extremes() {
        let v = [3.0, 1.0, 4.0, 1.0, 5.0];
        let hi = rolling_max(&v, 3);
        let lo = rolling_min(&v, 3);
        assert!(hi[1].is_nan());
        assert_approx(hi[2], 4.0, DEFAULT_EPSILON);
        assert_approx(lo[3], 1.0, DEFAULT_EPSILON);
        assert_approx(hi[4], 5.0, DEFAULT_EPSILON);
    }

    #[test]
    fn rolling_std_is_sample_stdev() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let out = rolling_std(&v, 8);
        // Sample stdev of this classic set is sqrt(32/7)
        assert_approx(out[7], (32.0f64 / 7.0).sqrt(), DEFAULT_EPSILON);
    }

    #[test]
    fn rolling_std_period_one_is_undefined() {
        let out = rolling_std(&[1.0, 2.0], 1);
        assert!(out.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn median_ignores_holes() {
        assert_approx(median(&[f64::NAN, 3.0, 1.0, 2.0]), 2.0, DEFAULT_EPSILON);
        assert!(median(&[f64::NAN]).is_nan());
    }
}
