//! Indicator library.
//!
//! Pure functions over a bar slice. Two shapes:
//! - series functions return a `Vec<Option<f64>>` aligned with the bars
//!   (`None` during warmup);
//! - point-in-time functions take `back` (0 = latest bar) and return
//!   `Option<f64>`.
//!
//! `None` means "not available" (too little history). It is never an error,
//! and callers treat it as a condition that cannot fire.

pub mod adx;
pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod obv;
pub mod rolling;
pub mod rsi;
pub mod sma;
pub mod stats;

pub use adx::{directional, wilder_average, wilder_sum, Adx, DirectionalSeries};
pub use atr::{atr_at, true_range, Atr};
pub use bollinger::{bollinger_at, Bollinger, BollingerBand, BollingerBands};
pub use ema::{ema_series, Ema};
pub use macd::{macd, Macd, MacdLine, MacdSeries};
pub use obv::{obv, Obv};
pub use rolling::{
    avg_turnover, avg_volume, median_turnover, rolling_high, rolling_low, window,
};
pub use rsi::{rsi_at, rsi_series, Rsi};
pub use sma::{sma_at, sma_series, Sma};
pub use stats::{last_two_swing_highs, linreg_slope, rises_in_last};

use crate::domain::Bar;

/// Trait for series indicators.
///
/// Indicators take a full bar series and produce an output series of the same
/// length. The first `lookback()` values are `None` (warmup).
///
/// No value at bar t may depend on bars after t.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "sma_20", "adx_14").
    fn name(&self) -> &str;

    /// Number of bars needed before the indicator produces valid output.
    fn lookback(&self) -> usize;

    /// Compute the indicator for the entire bar series.
    fn compute(&self, bars: &[Bar]) -> Vec<Option<f64>>;
}

/// Create synthetic bars from close prices for testing.
///
/// Generates plausible OHLV: open = prev_close (or close for first bar),
/// high = max(open,close) + 1.0, low = min(open,close) - 1.0, volume = 1000.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                date: base_date + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000,
            }
        })
        .collect()
}

/// Create bars from explicit (open, high, low, close) tuples.
#[cfg(test)]
pub fn make_ohlc_bars(data: &[(f64, f64, f64, f64)]) -> Vec<Bar> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    data.iter()
        .enumerate()
        .map(|(i, &(open, high, low, close))| Bar {
            date: base_date + chrono::Duration::days(i as i64),
            open,
            high,
            low,
            close,
            volume: 1000,
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
pub const DEFAULT_EPSILON: f64 = 1e-10;
