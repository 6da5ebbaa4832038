//! Momentum-decay detectors evaluated at an arbitrary bar index.

use crate::domain::Bar;

/// RSI top divergence at `idx`.
///
/// The reference pivot is the highest close in `[idx − window − 5, idx − 3]`.
/// Fires when price is at least `price_delta` above that pivot while RSI is
/// not above its pivot value, or is turning down from yesterday.
pub fn rsi_top_divergence(
    bars: &[Bar],
    rsi: &[Option<f64>],
    idx: usize,
    window: usize,
    price_delta: f64,
) -> bool {
    if idx <= 3 || idx >= bars.len() {
        return false;
    }
    let start = idx.saturating_sub(window + 5);
    let mut pivot = start;
    for i in start..=idx - 3 {
        if bars[i].close > bars[pivot].close {
            pivot = i;
        }
    }

    let price_higher = bars[idx].close >= bars[pivot].close * (1.0 + price_delta);
    let (Some(now), Some(at_pivot)) = (rsi[idx], rsi[pivot]) else {
        return false;
    };
    let turning = rsi[idx - 1].is_some_and(|y| now < y);
    price_higher && (now <= at_pivot || turning)
}

/// Positive MACD histogram shrinking on each of the last `down_days`
/// sessions, with a total drop of at least `drop_ratio` against the value
/// `down_days` sessions ago.
pub fn macd_contraction(hist: &[Option<f64>], idx: usize, down_days: usize, drop_ratio: f64) -> bool {
    if idx <= down_days || idx >= hist.len() {
        return false;
    }
    let Some(now) = hist[idx] else {
        return false;
    };
    if now <= 0.0 {
        return false;
    }
    let shrinking = (idx + 1 - down_days..=idx)
        .all(|i| matches!((hist[i], hist[i - 1]), (Some(a), Some(b)) if a < b));
    let Some(base) = hist[idx - down_days] else {
        return false;
    };
    shrinking && (base - now) / (base.abs() + 1e-9) >= drop_ratio
}

/// Whether `detect` holds on at least `min_hits` of the last `window` sessions.
pub fn confirmed(last: usize, window: usize, min_hits: usize, detect: impl Fn(usize) -> bool) -> bool {
    let hits = (0..window)
        .filter_map(|k| last.checked_sub(k))
        .filter(|&i| detect(i))
        .count();
    hits >= min_hits
}
