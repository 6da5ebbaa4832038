//! Bollinger Bands: moving average +/- standard deviation multiplier.
//!
//! Uses population stddev (divide by N).
//! Lookback: period - 1.

use super::rolling::window;
use super::Indicator;
use crate::domain::Bar;

/// Which band of the Bollinger Bands to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BollingerBand {
    Upper,
    Middle,
    Lower,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BollingerBands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

fn bands_over(closes: impl Iterator<Item = f64> + Clone, period: usize, k: f64) -> BollingerBands {
    let p = period as f64;
    let mean = closes.clone().sum::<f64>() / p;
    let var = closes.map(|c| (c - mean).powi(2)).sum::<f64>() / p;
    let sd = var.sqrt();
    BollingerBands {
        upper: mean + k * sd,
        middle: mean,
        lower: mean - k * sd,
    }
}

/// Bands over the `period` closes ending `back` bars before the latest.
pub fn bollinger_at(bars: &[Bar], period: usize, k: f64, back: usize) -> Option<BollingerBands> {
    let w = window(bars.len(), period, back)?;
    Some(bands_over(bars[w].iter().map(|b| b.close), period, k))
}

#[derive(Debug, Clone)]
pub struct Bollinger {
    period: usize,
    multiplier: f64,
    band: BollingerBand,
    name: String,
}

impl Bollinger {
    pub fn new(period: usize, multiplier: f64, band: BollingerBand) -> Self {
        assert!(period >= 1, "Bollinger period must be >= 1");
        let tag = match band {
            BollingerBand::Upper => "upper",
            BollingerBand::Middle => "middle",
            BollingerBand::Lower => "lower",
        };
        Self {
            period,
            multiplier,
            band,
            name: format!("bollinger_{tag}_{period}_{multiplier}"),
        }
    }
}

impl Indicator for Bollinger {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, bars: &[Bar]) -> Vec<Option<f64>> {
        let n = bars.len();
        let mut result = vec![None; n];
        if n < self.period {
            return result;
        }
        for (i, slot) in result.iter_mut().enumerate().skip(self.period - 1) {
            let start = i + 1 - self.period;
            let b = bands_over(
                bars[start..=i].iter().map(|b| b.close),
                self.period,
                self.multiplier,
            );
            *slot = Some(match self.band {
                BollingerBand::Upper => b.upper,
                BollingerBand::Middle => b.middle,
                BollingerBand::Lower => b.lower,
            });
        }
        result
    }
}
