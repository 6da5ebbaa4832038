//! Average True Range (ATR).
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|)
//! ATR here is the simple mean of the last `period` true ranges.
//! Lookback: period (needs period+1 bars).

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    name: String,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ATR period must be >= 1");
        Self {
            period,
            name: format!("atr_{period}"),
        }
    }
}

/// True Range series. TR[0] is `None` (no previous close).
pub fn true_range(bars: &[Bar]) -> Vec<Option<f64>> {
    let mut tr = vec![None; bars.len()];
    for i in 1..bars.len() {
        let (h, l, pc) = (bars[i].high, bars[i].low, bars[i - 1].close);
        tr[i] = Some((h - l).max((h - pc).abs()).max((l - pc).abs()));
    }
    tr
}

/// Mean true range over the `period` bars ending `back` bars before the latest.
pub fn atr_at(bars: &[Bar], period: usize, back: usize) -> Option<f64> {
    let end = bars.len().checked_sub(back + 1)?;
    if period == 0 || end < period {
        return None;
    }
    let tr = true_range(&bars[(end - period)..=end]);
    Some(tr.iter().flatten().sum::<f64>() / period as f64)
}

impl Indicator for Atr {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<Option<f64>> {
        let tr = true_range(bars);
        let mut result = vec![None; bars.len()];
        if bars.len() <= self.period {
            return result;
        }
        let mut sum: f64 = tr[1..=self.period].iter().flatten().sum();
        result[self.period] = Some(sum / self.period as f64);
        for i in (self.period + 1)..bars.len() {
            sum += tr[i].unwrap_or(0.0) - tr[i - self.period].unwrap_or(0.0);
            result[i] = Some(sum / self.period as f64);
        }
        result
    }
}
