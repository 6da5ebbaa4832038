//! Cheap first-stage checks: history length, price floor and liquidity.

use super::config::{LiquidityConfig, ScreenConfig};
use super::RejectReason;
use crate::domain::Bar;
use crate::indicators::{avg_turnover, median_turnover};

/// Turnover figures behind the liquidity verdict.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Liquidity {
    pub median: f64,
    pub mean: f64,
    pub today: f64,
    pub ok: bool,
}

/// Liquidity over the last `window` sessions (fewer if history is short).
///
/// Passes on any of: median turnover ≥ floor, mean turnover ≥ floor, or a
/// surge day with today's turnover ≥ multiple × a positive median.
pub fn liquidity(bars: &[Bar], cfg: &LiquidityConfig) -> Liquidity {
    let take = cfg.window.min(bars.len());
    let today = bars.last().map_or(0.0, Bar::turnover);
    let mean = avg_turnover(bars, take, 0).unwrap_or(0.0);
    let median = median_turnover(bars, take, 0).unwrap_or(0.0);

    let ok = median >= cfg.min_median_turnover
        || mean >= cfg.min_avg_turnover
        || (median > 0.0 && today >= cfg.surge_multiple * median);
    Liquidity {
        median,
        mean,
        today,
        ok,
    }
}

/// History, price floor and liquidity, in that order.
pub fn basic_checks(bars: &[Bar], min_bars: usize, cfg: &ScreenConfig) -> Result<Liquidity, RejectReason> {
    if bars.len() < min_bars.max(2) {
        return Err(RejectReason::InsufficientHistory);
    }
    let Some(last) = bars.last() else {
        return Err(RejectReason::InsufficientHistory);
    };
    if last.close < cfg.min_price {
        return Err(RejectReason::PriceFloor);
    }
    let liq = liquidity(bars, &cfg.liquidity);
    if !liq.ok {
        return Err(RejectReason::Liquidity);
    }
    Ok(liq)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    fn with_volumes(close: f64, volumes: &[u64]) -> Vec<Bar> {
        let mut bars = make_bars(&vec![close; volumes.len()]);
        for (b, &v) in bars.iter_mut().zip(volumes) {
            b.volume = v;
        }
        bars
    }

    #[test]
    fn median_floor_passes() {
        // 1000 × 250_000 = 2.5e8 every day
        let bars = with_volumes(1000.0, &[250_000; 30]);
        let liq = liquidity(&bars, &LiquidityConfig::default());
        assert!(liq.ok);
        assert_eq!(liq.median, 2.5e8);
    }

    #[test]
    fn surge_day_passes_thin_names() {
        let mut volumes = vec![10_000u64; 29];
        volumes.push(40_000);
        let bars = with_volumes(1000.0, &volumes);
        let liq = liquidity(&bars, &LiquidityConfig::default());
        assert!(liq.ok);
        assert_eq!(liq.today, 4e7);
    }

    #[test]
    fn thin_names_fail() {
        let bars = with_volumes(1000.0, &[10_000; 30]);
        assert!(!liquidity(&bars, &LiquidityConfig::default()).ok);
    }

    #[test]
    fn checks_run_in_order() {
        let cfg = ScreenConfig::default();
        let short = with_volumes(1000.0, &[1_000_000; 10]);
        assert_eq!(basic_checks(&short, 30, &cfg), Err(RejectReason::InsufficientHistory));
        let cheap = with_volumes(100.0, &[10; 40]);
        assert_eq!(basic_checks(&cheap, 30, &cfg), Err(RejectReason::PriceFloor));
        let thin = with_volumes(1000.0, &[10; 40]);
        assert_eq!(basic_checks(&thin, 30, &cfg), Err(RejectReason::Liquidity));
    }
}
