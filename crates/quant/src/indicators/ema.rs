/// Exponential moving average with smoothing factor `2/(n+1)`, seeded with
/// the simple average of the first `n` valid values. Positions before the
/// seed are NaN; a NaN input leaves a hole but the recurrence continues from
/// its last state.
pub fn ema(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut out = vec![f64::NAN; n];
    if period == 0 || n < period {
        return out;
    }

    // Seed at the end of the first run of `period` consecutive valid values.
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

    let k = 2.0 / (period as f64 + 1.0);
    let mut prev = seed;
    for i in seed_idx + 1..n {
        if values[i].is_nan() {
            continue;
        }
        prev = values[i] * k + prev * (1.0 - k);
        out[i] = prev;
    }
    out
}
