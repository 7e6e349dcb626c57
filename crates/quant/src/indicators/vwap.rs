use common::Bar;

/// Cumulative volume-weighted average price: running sum of typical price
/// times volume over running volume. Bars with non-finite volume are skipped
/// by the accumulator; positions before any volume has accumulated are holes.
pub fn vwap(bars: &[Bar]) -> Vec<f64> {
    let mut out = vec![f64::NAN; bars.len()];
    let mut cum_pv = 0.0;
    let mut cum_vol = 0.0;
    for (i, b) in bars.iter().enumerate() {
        let tp = (b.high + b.low + b.close) / 3.0;
        if b.volume.is_finite() && tp.is_finite() {
            cum_pv += tp * b.volume;
            cum_vol += b.volume;
        }
        if cum_vol > 0.0 {
            out[i] = cum_pv / cum_vol;
        }
    }
    out
}
