//! Pure numerical primitives over aligned OHLCV arrays.
//!
//! Every primitive returns channels index-aligned with the input bars.
//! Positions that cannot be computed (insufficient lookback, guarded
//! divisions) hold NaN and serialize as null downstream; channel length
//! always equals the bar count. Running accumulators (EMA smoothing, Wilder
//! smoothing for RSI/ATR) seed with the simple average of their first `n`
//! observations.

pub mod atr;
pub mod bollinger;
pub mod cci;
pub mod donchian;
pub mod ema;
pub mod kalman;
pub mod keltner;
pub mod macd;
pub mod regime;
pub mod roc;
pub mod roll;
pub mod rsi;
pub mod sma;
pub mod stochastic;
pub mod supertrend;
pub mod volume;
pub mod vwap;
pub mod zscore;

pub use atr::{atr, true_range, wilder};
pub use bollinger::bollinger;
pub use cci::cci;
pub use donchian::donchian;
pub use ema::ema;
pub use kalman::{kalman_1d, KalmanOutput};
pub use keltner::keltner;
pub use macd::macd;
pub use regime::regime;
pub use roc::roc;
pub use rsi::rsi;
pub use sma::sma;
pub use stochastic::stochastic;
pub use supertrend::supertrend;
pub use volume::volume_ratio;
pub use vwap::vwap;
pub use zscore::zscore;

use common::Bar;

pub fn closes(bars: &[Bar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}

pub fn volumes(bars: &[Bar]) -> Vec<f64> {
    bars.iter().map(|b| b.volume).collect()
}

/// Create synthetic bars from close prices for testing.
///
/// Generates plausible OHLCV: open = prev close (or close for the first bar),
/// high = max(open, close) + 1.0, low = min(open, close) - 1.0, volume 1000,
/// daily timestamps.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                ts: 1_700_000_000 + i as i64 * 86_400,
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000.0,
            }
        })
        .collect()
}

/// Bars where every OHLCV field is the same constant. Exercises the
/// zero-range / zero-variance guards.
#[cfg(test)]
pub fn flat_bars(n: usize, price: f64) -> Vec<Bar> {
    (0..n)
        .map(|i| Bar {
            ts: 1_700_000_000 + i as i64 * 86_400,
            open: price,
            high: price,
            low: price,
            close: price,
            volume: 500.0,
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-9;
