//! Window helpers: rolling high/low, average volume and turnover.

use crate::domain::Bar;
use std::ops::Range;

/// Index range of a `period`-bar window ending `back` bars before the end.
///
/// `None` when the window does not fit in `len` bars.
pub fn window(len: usize, period: usize, back: usize) -> Option<Range<usize>> {
    if period == 0 {
        return None;
    }
    let end = len.checked_sub(back)?;
    let start = end.checked_sub(period)?;
    Some(start..end)
}

/// Highest high over the window.
pub fn rolling_high(bars: &[Bar], period: usize, back: usize) -> Option<f64> {
    let w = window(bars.len(), period, back)?;
    bars[w].iter().map(|b| b.high).reduce(f64::max)
}

/// Lowest low over the window.
pub fn rolling_low(bars: &[Bar], period: usize, back: usize) -> Option<f64> {
    let w = window(bars.len(), period, back)?;
    bars[w].iter().map(|b| b.low).reduce(f64::min)
}

/// Mean volume over the window.
pub fn avg_volume(bars: &[Bar], period: usize, back: usize) -> Option<f64> {
    let w = window(bars.len(), period, back)?;
    Some(bars[w].iter().map(Bar::volume_f64).sum::<f64>() / period as f64)
}

/// Mean turnover (close × volume) over the window.
pub fn avg_turnover(bars: &[Bar], period: usize, back: usize) -> Option<f64> {
    let w = window(bars.len(), period, back)?;
    Some(bars[w].iter().map(Bar::turnover).sum::<f64>() / period as f64)
}

/// Median turnover over the window.
pub fn median_turnover(bars: &[Bar], period: usize, back: usize) -> Option<f64> {
    let w = window(bars.len(), period, back)?;
    let mut values: Vec<f64> = bars[w].iter().map(Bar::turnover).collect();
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        Some(values[mid])
    } else {
        Some((values[mid - 1] + values[mid]) / 2.0)
    }
}
