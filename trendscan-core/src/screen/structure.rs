//! Price structure: moving-average stacking and proximity to the 52-week high.

use super::config::ScreenConfig;
use crate::domain::Bar;
use crate::indicators::{rolling_high, sma_at};

/// Sessions in a trading year.
pub const YEAR_BARS: usize = 252;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Structure {
    pub sma10: f64,
    pub sma20: f64,
    pub sma50: f64,
    pub high_52w: f64,
    /// `(high52 − close) / high52`.
    pub dist_52w: f64,
    pub strong: bool,
    pub early: bool,
}

impl Structure {
    pub fn passes(&self) -> bool {
        self.strong || self.early
    }
}

/// Highest high over the last year, or all history if shorter.
pub fn high_52w(bars: &[Bar]) -> Option<f64> {
    rolling_high(bars, YEAR_BARS.min(bars.len()), 0)
}

/// `None` when there is not enough history for SMA50 and its previous value.
pub fn structure(bars: &[Bar], cfg: &ScreenConfig) -> Option<Structure> {
    let close = bars.last()?.close;
    let sma10 = sma_at(bars, 10, 0)?;
    let sma20 = sma_at(bars, 20, 0)?;
    let sma50 = sma_at(bars, 50, 0)?;
    let prev20 = sma_at(bars, 20, 1)?;
    let prev50 = sma_at(bars, 50, 1)?;
    let high = high_52w(bars)?;
    let dist = (high - close) / if high <= 0.0 { 1.0 } else { high };

    let rising = sma20 > prev20 && sma50 > prev50;
    let strong = close > sma10
        && sma10 > sma20
        && sma20 > sma50
        && rising
        && dist <= cfg.max_dist_52w;
    let early = close > sma20 && sma20 > sma50 && rising && dist <= cfg.max_dist_52w_early;

    Some(Structure {
        sma10,
        sma20,
        sma50,
        high_52w: high,
        dist_52w: dist,
        strong,
        early,
    })
}
