//! On-Balance Volume (OBV).
//!
//! Running sum: +volume on an up close, -volume on a down close, unchanged
//! on a flat close. OBV[0] = 0. Always defined.

use super::Indicator;
use crate::domain::Bar;

pub fn obv(bars: &[Bar]) -> Vec<f64> {
    let mut out = Vec::with_capacity(bars.len());
    let mut acc = 0.0;
    for (i, bar) in bars.iter().enumerate() {
        if i > 0 {
            let prev = bars[i - 1].close;
            if bar.close > prev {
                acc += bar.volume_f64();
            } else if bar.close < prev {
                acc -= bar.volume_f64();
            }
        }
        out.push(acc);
    }
    out
}

#[derive(Debug, Clone, Default)]
pub struct Obv;

impl Indicator for Obv {
    fn name(&self) -> &str {
        "obv"
    }

    fn lookback(&self) -> usize {
        0
    }

    fn compute(&self, bars: &[Bar]) -> Vec<Option<f64>> {
        obv(bars).into_iter().map(Some).collect()
    }
}
