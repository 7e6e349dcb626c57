use super::sma;

/// Two-state market regime from the rolling mean of one-bar returns.
///
/// Returns (regime, mean_return): regime is +1.0 while the rolling mean
/// return over `lookback` is positive (bull) and -1.0 otherwise (bear), with
/// holes until the window fills.
pub fn regime(closes: &[f64], lookback: usize) -> (Vec<f64>, Vec<f64>) {
    let n = closes.len();
    let mut returns = vec![f64::NAN; n];
    for i in 1..n {
        let prev = closes[i - 1];
        if prev.is_nan() || prev == 0.0 || closes[i].is_nan() {
            continue;
        }
        returns[i] = closes[i] / prev - 1.0;
    }

    let mean_ret = sma(&returns, lookback);
    let regimes: Vec<f64> = mean_ret
        .iter()
        .map(|m| {
            if m.is_nan() {
                f64::NAN
            } else if *m > 0.0 {
                1.0
            } else {
                -1.0
            }
        })
        .collect();

    (regimes, mean_ret)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn up_then_down_switches_regime() {
        let mut closes: Vec<f64> = (0..15).map(|i| 100.0 + i as f64).collect();
        closes.extend((0..15).map(|i| 114.0 - i as f64 * 2.0));
        let (reg, _) = regime(&closes, 5);
        assert!(reg.contains(&1.0));
        assert!(reg.contains(&-1.0));
    }

    #[test]
    fn flat_series_is_bear_side_not_hole() {
        let (reg, mean) = regime(&[10.0; 12], 5);
        // zero mean return maps to the bear state by definition
        assert!(reg[6..].iter().all(|r| *r == -1.0));
        assert!(mean[6..].iter().all(|m| *m == 0.0));
    }
}
