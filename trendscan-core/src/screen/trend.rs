//! Trend confirmation: moving-average stack, 200-day regime, ADX/DI and
//! (optionally) a relaxed MACD test. Three interchangeable templates.

use super::config::{ScreenConfig, TrendMode};
use super::structure::{high_52w, YEAR_BARS};
use crate::domain::Bar;
use crate::indicators::{
    directional, linreg_slope, macd, rises_in_last, rolling_low, sma_at, DirectionalSeries,
    MacdSeries,
};
use tracing::trace;

const MACD_FAST: usize = 12;
const MACD_SLOW: usize = 26;
const MACD_SIGNAL: usize = 9;
const NEAR_ZERO_WINDOW: usize = 34;

/// Bars the trend stage needs before it can pass at all.
pub fn required_bars(cfg: &ScreenConfig) -> usize {
    200.max(cfg.adx_period + MACD_SLOW + MACD_SIGNAL + 5)
}

/// Inputs shared by every template, kept for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendFacts {
    /// How many of close>SMA5, SMA5>SMA20, SMA20>SMA60, SMA60>SMA120 hold.
    pub stack_count: u8,
    pub above_200: bool,
    pub ma200_up: bool,
    pub di_ok: bool,
    pub adx: Option<f64>,
    pub trend_ok: bool,
}

impl TrendFacts {
    pub fn stacked(&self) -> bool {
        self.stack_count == 4
    }

    pub fn stacked_3of4(&self) -> bool {
        self.stack_count >= 3
    }

    fn regime_ok(&self) -> bool {
        self.above_200 && (self.ma200_up || self.di_ok)
    }
}

fn gt(a: Option<f64>, b: Option<f64>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a > b)
}

pub fn trend_facts(bars: &[Bar], dmi: &DirectionalSeries, cfg: &ScreenConfig) -> Option<TrendFacts> {
    let close = Some(bars.last()?.close);
    let ma5 = sma_at(bars, 5, 0);
    let ma20 = sma_at(bars, 20, 0);
    let ma60 = sma_at(bars, 60, 0);
    let ma120 = sma_at(bars, 120, 0);
    let ma200 = sma_at(bars, 200, 0);
    let ma200_prev = sma_at(bars, 200, cfg.ma200_slope_lookback);

    let stack_count = [gt(close, ma5), gt(ma5, ma20), gt(ma20, ma60), gt(ma60, ma120)]
        .into_iter()
        .filter(|&b| b)
        .count() as u8;

    let adx = dmi.adx_back(0);
    let di_ok = gt(dmi.plus_di_back(0), dmi.minus_di_back(0));
    let adx_strong = adx.is_some_and(|a| a >= cfg.adx_strong);
    let trend_ok = adx_strong || (linreg_slope(&dmi.adx, 5) > 0.0 && di_ok);

    Some(TrendFacts {
        stack_count,
        above_200: gt(close, ma200),
        ma200_up: gt(ma200, ma200_prev),
        di_ok,
        adx,
        trend_ok,
    })
}

/// Lenient MACD check: any one of five momentum hints suffices.
pub fn macd_relaxed(m: &MacdSeries) -> bool {
    let h = &m.histogram;
    let n = h.len();
    if n < 2 {
        return false;
    }
    let (h0, h1) = (h[n - 1], h[n - 2]);

    let not_worsening = matches!((h0, h1), (Some(a), Some(b)) if a >= b);

    let mean3 = |end: usize| -> Option<f64> {
        let start = end.checked_sub(2)?;
        let sum: Option<f64> = h[start..=end].iter().copied().sum();
        Some(sum? / 3.0)
    };
    let sma_rising = n >= 4 && gt(mean3(n - 1), mean3(n - 2));

    let rising_2of3 = rises_in_last(h, 3) >= 2;

    let cross_up = gt(m.signal[n - 2], m.macd[n - 2])
        && matches!((m.macd[n - 1], m.signal[n - 1]), (Some(a), Some(b)) if a >= b);

    let near_zero = h0.is_some_and(|v| v.abs() <= 2.0 * near_zero_band(h));

    not_worsening || sma_rising || rising_2of3 || cross_up || near_zero
}

/// `max(1e-4, 0.25 × mean |hist|)` over the last 34 defined values.
pub fn near_zero_band(hist: &[Option<f64>]) -> f64 {
    let recent: Vec<f64> = hist
        .iter()
        .rev()
        .flatten()
        .take(NEAR_ZERO_WINDOW)
        .map(|v| v.abs())
        .collect();
    let band = if recent.is_empty() {
        0.0
    } else {
        0.25 * recent.iter().sum::<f64>() / recent.len() as f64
    };
    band.max(1e-4)
}

/// Number of Minervini template criteria met (out of 7).
pub fn minervini_score(bars: &[Bar]) -> usize {
    let Some(last) = bars.last() else {
        return 0;
    };
    let price = last.close;
    let close = Some(price);
    let ma50 = sma_at(bars, 50, 0);
    let ma150 = sma_at(bars, 150, 0);
    let ma200 = sma_at(bars, 200, 0);
    let ma200_prev = sma_at(bars, 200, 20);
    let low = rolling_low(bars, YEAR_BARS.min(bars.len()), 0);
    let high = high_52w(bars);

    [
        gt(close, ma150) && gt(close, ma200),
        gt(ma150, ma200),
        gt(ma200, ma200_prev),
        gt(ma50, ma150) && gt(ma50, ma200),
        gt(close, ma50),
        low.is_some_and(|l| price >= 1.25 * l),
        high.is_some_and(|h| price >= 0.75 * h),
    ]
    .into_iter()
    .filter(|&b| b)
    .count()
}

/// Full trend verdict under the configured template.
pub fn passes_trend(bars: &[Bar], dmi: &DirectionalSeries, cfg: &ScreenConfig) -> bool {
    if bars.len() < required_bars(cfg) {
        return false;
    }
    let Some(facts) = trend_facts(bars, dmi, cfg) else {
        return false;
    };

    let pass = match cfg.trend_mode {
        TrendMode::Minervini => minervini_score(bars) >= 6,
        TrendMode::AdxOnly => facts.stacked_3of4() && facts.regime_ok() && facts.trend_ok,
        TrendMode::Hybrid => {
            let base = (facts.stacked() || facts.stacked_3of4())
                && facts.regime_ok()
                && facts.trend_ok;
            base && (!cfg.require_macd
                || macd_relaxed(&macd(bars, MACD_FAST, MACD_SLOW, MACD_SIGNAL)))
        }
    };
    trace!(mode = %cfg.trend_mode, ?facts, pass, "trend check");
    pass
}

/// Convenience for callers that have not computed the DMI yet.
pub fn passes_trend_bars(bars: &[Bar], cfg: &ScreenConfig) -> bool {
    passes_trend(bars, &directional(bars, cfg.adx_period), cfg)
}
