//! ADX: Average Directional Index (Wilder).
//!
//! Steps:
//! 1. Compute +DM, -DM and TR from consecutive bars
//! 2. Wilder-smooth them in sum form: seed = sum of the first N values,
//!    then `new = old - old/N + today`
//! 3. +DI = 100 * smoothed(+DM) / smoothed(TR), likewise -DI
//! 4. DX = 100 * |+DI - -DI| / (+DI + -DI)
//! 5. ADX seed = mean of the first N DX values, then `(prev*(N-1) + dx) / N`
//!
//! DI is defined from index N, ADX from index 2N-1 (needs 2N bars).

use super::atr::true_range;
use super::Indicator;
use crate::domain::Bar;

/// Wilder running sum: seed = sum of `values[..period]` at index period-1.
pub fn wilder_sum(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let n = values.len();
    let mut result = vec![None; n];
    if period == 0 || n < period {
        return result;
    }
    let p = period as f64;
    let mut acc: f64 = values[..period].iter().sum();
    result[period - 1] = Some(acc);
    for i in period..n {
        acc = acc - acc / p + values[i];
        result[i] = Some(acc);
    }
    result
}

/// Wilder running average: seed = mean of `values[..period]`, then
/// `(prev * (period - 1) + today) / period`.
pub fn wilder_average(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let n = values.len();
    let mut result = vec![None; n];
    if period == 0 || n < period {
        return result;
    }
    let p = period as f64;
    let mut avg = values[..period].iter().sum::<f64>() / p;
    result[period - 1] = Some(avg);
    for i in period..n {
        avg = (avg * (p - 1.0) + values[i]) / p;
        result[i] = Some(avg);
    }
    result
}

/// Directional movement outputs, aligned with the input bars.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirectionalSeries {
    pub plus_di: Vec<Option<f64>>,
    pub minus_di: Vec<Option<f64>>,
    pub adx: Vec<Option<f64>>,
    /// Wilder-smoothed TR divided by N.
    pub atr: Vec<Option<f64>>,
}

impl DirectionalSeries {
    fn at(series: &[Option<f64>], back: usize) -> Option<f64> {
        let idx = series.len().checked_sub(back + 1)?;
        series[idx]
    }

    pub fn adx_back(&self, back: usize) -> Option<f64> {
        Self::at(&self.adx, back)
    }

    pub fn plus_di_back(&self, back: usize) -> Option<f64> {
        Self::at(&self.plus_di, back)
    }

    pub fn minus_di_back(&self, back: usize) -> Option<f64> {
        Self::at(&self.minus_di, back)
    }

    pub fn atr_back(&self, back: usize) -> Option<f64> {
        Self::at(&self.atr, back)
    }
}

pub fn directional(bars: &[Bar], period: usize) -> DirectionalSeries {
    let n = bars.len();
    let mut out = DirectionalSeries {
        plus_di: vec![None; n],
        minus_di: vec![None; n],
        adx: vec![None; n],
        atr: vec![None; n],
    };
    if period == 0 || n <= period {
        return out;
    }

    // Movement series start at bar 1; index k here is bar k+1.
    let tr: Vec<f64> = true_range(bars).into_iter().skip(1).flatten().collect();
    let mut plus_dm = Vec::with_capacity(n - 1);
    let mut minus_dm = Vec::with_capacity(n - 1);
    for i in 1..n {
        let up = bars[i].high - bars[i - 1].high;
        let down = bars[i - 1].low - bars[i].low;
        plus_dm.push(if up > down && up > 0.0 { up } else { 0.0 });
        minus_dm.push(if down > up && down > 0.0 { down } else { 0.0 });
    }

    let s_tr = wilder_sum(&tr, period);
    let s_plus = wilder_sum(&plus_dm, period);
    let s_minus = wilder_sum(&minus_dm, period);

    let mut dx = Vec::with_capacity(n);
    for k in 0..tr.len() {
        let (Some(t), Some(p), Some(m)) = (s_tr[k], s_plus[k], s_minus[k]) else {
            continue;
        };
        let bar_idx = k + 1;
        out.atr[bar_idx] = Some(t / period as f64);
        if t == 0.0 {
            out.plus_di[bar_idx] = Some(0.0);
            out.minus_di[bar_idx] = Some(0.0);
            dx.push(0.0);
            continue;
        }
        let pdi = 100.0 * p / t;
        let mdi = 100.0 * m / t;
        out.plus_di[bar_idx] = Some(pdi);
        out.minus_di[bar_idx] = Some(mdi);
        let sum = pdi + mdi;
        dx.push(if sum == 0.0 {
            0.0
        } else {
            100.0 * (pdi - mdi).abs() / sum
        });
    }

    // DX starts at bar `period`.
    for (j, v) in wilder_average(&dx, period).into_iter().enumerate() {
        out.adx[j + period] = v;
    }
    out
}

#[derive(Debug, Clone)]
pub struct Adx {
    period: usize,
    name: String,
}

impl Adx {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ADX period must be >= 1");
        Self {
            period,
            name: format!("adx_{period}"),
        }
    }
}

impl Indicator for Adx {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        2 * self.period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<Option<f64>> {
        directional(bars, self.period).adx
    }
}
