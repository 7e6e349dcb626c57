use common::Bar;

/// True Range series. `tr[0]` is NaN (no previous close);
/// `tr[i] = max(high-low, |high-prev_close|, |low-prev_close|)`.
pub fn true_range(bars: &[Bar]) -> Vec<f64> {
    let n = bars.len();
    let mut tr = vec![f64::NAN; n];
    for i in 1..n {
        let h = bars[i].high;
        let l = bars[i].low;
        let pc = bars[i - 1].close;
        if h.is_nan() || l.is_nan() || pc.is_nan() {
            continue;
        }
        tr[i] = (h - l).max((h - pc).abs()).max((l - pc).abs());
    }
    tr
}

/// Wilder smoothing (alpha = 1/period), seeded with the simple average of the
/// first `period` consecutive valid values. Holes before the seed; the
/// recurrence carries across later NaN inputs, leaving a hole at each.
pub fn wilder(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut out = vec![f64::NAN; n];
    if period == 0 || n < period {
        return out;
    }

    let mut run = 0usize;
    let mut seed_idx = None;
    for (i, v) in values.iter().enumerate() {
        if v.is_nan() {
            run = 0;
        } else {
            run += 1;
            if run == period {
                seed_idx = Some(i);
                break;
            }
        }
    }
    let Some(seed_idx) = seed_idx else {
        return out;
    };

    let seed =
        values[seed_idx + 1 - period..=seed_idx].iter().sum::<f64>() / period as f64;
    out[seed_idx] = seed;

    let alpha = 1.0 / period as f64;
    let mut prev = seed;
    for i in seed_idx + 1..n {
        if values[i].is_nan() {
            continue;
        }
        prev = alpha * values[i] + (1.0 - alpha) * prev;
        out[i] = prev;
    }
    out
}

/// Average True Range: Wilder-smoothed true range. First value lands at
/// index `period` (the TR series itself starts at index 1).
pub fn atr(bars: &[Bar], period: usize) -> Vec<f64> {
    wilder(&true_range(bars), period)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, flat_bars, DEFAULT_EPSILON};
    use common::Bar;

    fn ohlc(data: &[(f64, f64, f64, f64)]) -> Vec<Bar> {
        data.iter()
            .enumerate()
            .map(|(i, &(open, high, low, close))| Bar {
                ts: i as i64,
                open,
                high,
                low,
                close,
                volume: 1000.0,
            })
            .collect()
    }

    #[test]
    fn true_range_covers_gaps() {
        let bars = ohlc(&[
            (98.0, 102.0, 97.0, 100.0),
            (110.0, 115.0, 108.0, 112.0), // gap up: TR = max(7, 15, 8) = 15
        ]);
        let tr = true_range(&bars);
        assert!(tr[0].is_nan());
        assert_approx(tr[1], 15.0, DEFAULT_EPSILON);
    }

    #[test]
    fn atr_seed_and_recurrence() {
        let bars = ohlc(&[
            (100.0, 105.0, 95.0, 102.0),
            (102.0, 108.0, 100.0, 106.0), // TR 8
            (106.0, 107.0, 98.0, 99.0),   // TR 9
            (99.0, 103.0, 97.0, 101.0),   // TR 6
            (101.0, 106.0, 100.0, 105.0), // TR 6
        ]);
        let out = atr(&bars, 3);
        assert!(out[2].is_nan());
        // Seed at index 3: mean(8, 9, 6)
        assert_approx(out[3], 23.0 / 3.0, DEFAULT_EPSILON);
        // (1/3)*6 + (2/3)*(23/3)
        assert_approx(out[4], 64.0 / 9.0, DEFAULT_EPSILON);
    }

    #[test]
    fn atr_of_flat_bars_is_zero_not_nan() {
        let out = atr(&flat_bars(10, 50.0), 3);
        assert!(out[3..].iter().all(|v| *v == 0.0));
    }
}
