//! Relative Strength Index (RSI).
//!
//! Ratio of summed gains to summed losses over the last `period` close-to-close
//! changes: RSI = 100 - 100 / (1 + gains / losses).
//! Lookback: period (needs period + 1 closes).
//! Edge cases: no movement at all → 50; no losses → 100.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    name: String,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "RSI period must be >= 1");
        Self {
            period,
            name: format!("rsi_{period}"),
        }
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<Option<f64>> {
        rsi_series(bars, self.period)
    }
}

fn rsi_from_sums(gains: f64, losses: f64) -> f64 {
    if gains == 0.0 && losses == 0.0 {
        50.0
    } else if losses == 0.0 {
        100.0
    } else {
        100.0 - 100.0 / (1.0 + gains / losses)
    }
}

/// RSI at every index that has `period` prior changes.
pub fn rsi_series(bars: &[Bar], period: usize) -> Vec<Option<f64>> {
    let n = bars.len();
    let mut result = vec![None; n];
    if period == 0 || n <= period {
        return result;
    }

    let change = |i: usize| bars[i].close - bars[i - 1].close;
    let mut gains = 0.0;
    let mut losses = 0.0;
    for i in 1..=period {
        let d = change(i);
        if d > 0.0 {
            gains += d;
        } else {
            losses -= d;
        }
    }
    result[period] = Some(rsi_from_sums(gains, losses));

    for i in (period + 1)..n {
        let leaving = change(i - period);
        if leaving > 0.0 {
            gains -= leaving;
        } else {
            losses += leaving;
        }
        let entering = change(i);
        if entering > 0.0 {
            gains += entering;
        } else {
            losses -= entering;
        }
        // Rolling sums can drift a hair below zero.
        result[i] = Some(rsi_from_sums(gains.max(0.0), losses.max(0.0)));
    }
    result
}

/// RSI over the `period` changes ending `back` bars before the latest.
pub fn rsi_at(bars: &[Bar], period: usize, back: usize) -> Option<f64> {
    let end = bars.len().checked_sub(back + 1)?;
    if period == 0 || end < period {
        return None;
    }
    let (gains, losses) = ((end + 1 - period)..=end).fold((0.0, 0.0), |(g, l), i| {
        let d = bars[i].close - bars[i - 1].close;
        if d > 0.0 {
            (g + d, l)
        } else {
            (g, l - d)
        }
    });
    Some(rsi_from_sums(gains, losses))
}
