//! Trend screening: a cheap prefilter and a full per-symbol filter.
//!
//! Both stages are pure functions of a [`BarStore`]; fetching and
//! parallelism live in the runner. Every rejection carries a
//! [`RejectReason`] so a run can report where its universe went.

pub mod candidate;
pub mod config;
pub mod prefilter;
pub mod signal;
pub mod structure;
pub mod trend;
pub mod volume;

pub use candidate::{candidate_order, sort_candidates, CandidateRecord};
pub use config::{LiquidityConfig, ScreenConfig, Strictness, TrendMode, VolumeConfig};
pub use prefilter::{liquidity, Liquidity};
pub use signal::{classify, Signal, Trigger};
pub use structure::Structure;

use crate::domain::BarStore;
use crate::indicators::{avg_turnover, avg_volume, directional};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Why a symbol was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RejectReason {
    InsufficientHistory,
    PriceFloor,
    Liquidity,
    Structure,
    Trend,
    Volume,
}

impl RejectReason {
    pub const ALL: [RejectReason; 6] = [
        RejectReason::InsufficientHistory,
        RejectReason::PriceFloor,
        RejectReason::Liquidity,
        RejectReason::Structure,
        RejectReason::Trend,
        RejectReason::Volume,
    ];
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RejectReason::InsufficientHistory => "insufficient_history",
            RejectReason::PriceFloor => "price_floor",
            RejectReason::Liquidity => "liquidity",
            RejectReason::Structure => "structure",
            RejectReason::Trend => "trend",
            RejectReason::Volume => "volume",
        };
        f.write_str(s)
    }
}

/// Applies a [`ScreenConfig`] to individual symbols.
#[derive(Debug, Clone, Default)]
pub struct Screener {
    config: ScreenConfig,
}

impl Screener {
    pub fn new(config: ScreenConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScreenConfig {
        &self.config
    }

    /// First stage: ≥ 30 bars, price floor, liquidity.
    pub fn prefilter(&self, store: &BarStore) -> Result<Liquidity, RejectReason> {
        prefilter::basic_checks(store.bars(), self.config.prefilter_min_bars, &self.config)
    }

    /// Second stage: every gate in order, then signal classification.
    pub fn evaluate(&self, name: &str, store: &BarStore) -> Result<CandidateRecord, RejectReason> {
        let cfg = &self.config;
        let bars = store.bars();
        let liq = prefilter::basic_checks(bars, cfg.full_min_bars, cfg)?;
        let last = *bars.last().ok_or(RejectReason::InsufficientHistory)?;

        let structure = structure::structure(bars, cfg).ok_or(RejectReason::InsufficientHistory)?;
        if !structure.passes() {
            return Err(RejectReason::Structure);
        }

        let dmi = directional(bars, cfg.adx_period);
        if !trend::passes_trend(bars, &dmi, cfg) {
            return Err(RejectReason::Trend);
        }

        let trigger = signal::classify(bars, cfg.breakout_volume_multiple);
        let signal = if volume::passes_volume(bars, &cfg.volume) {
            trigger.signal
        } else if cfg.strictness.rejects_volume_failure() {
            return Err(RejectReason::Volume);
        } else {
            Signal::Setup
        };

        let vol_ma20 = avg_volume(bars, 20, 0).ok_or(RejectReason::InsufficientHistory)?;
        let turnover_ma20 = avg_turnover(bars, 20, 0).ok_or(RejectReason::InsufficientHistory)?;
        let trigger_20h = trigger
            .trigger_20h
            .ok_or(RejectReason::InsufficientHistory)?;
        let atr_pct = dmi
            .atr_back(0)
            .filter(|_| last.close > 0.0)
            .map(|atr| atr / last.close);

        debug!(symbol = store.symbol(), %signal, dist = structure.dist_52w, "candidate");
        Ok(CandidateRecord {
            symbol: store.symbol().to_string(),
            name: if name.is_empty() { store.symbol() } else { name }.to_string(),
            date: last.date,
            close: last.close,
            sma10: structure.sma10,
            sma20: structure.sma20,
            sma50: structure.sma50,
            high_52w: structure.high_52w,
            dist_52w: structure.dist_52w,
            vol_ma20,
            turnover_ma20,
            trigger_20h,
            today_volume: last.volume,
            signal,
            adx: dmi.adx_back(0),
            plus_di: dmi.plus_di_back(0),
            minus_di: dmi.minus_di_back(0),
            atr_pct,
            median_turnover_20: liq.median,
            today_turnover: liq.today,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Bar;
    use chrono::NaiveDate;

    /// Steady uptrend with rising participation and a breakout on the last bar.
    /// Highs sit above the next close, so no earlier bar counts as a breakout.
    fn breakout_store(n: usize) -> BarStore {
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        let mut bars: Vec<Bar> = (0..n)
            .map(|i| {
                let close = 1000.0 + i as f64 * 2.0;
                Bar {
                    date: start + chrono::Duration::days(i as i64),
                    open: close - 1.0,
                    high: close + 3.0,
                    low: close - 3.0,
                    close,
                    volume: 1_000_000,
                }
            })
            .collect();
        let last = n - 1;
        for (k, b) in bars[last - 4..].iter_mut().enumerate() {
            b.volume = 1_300_000 + 100_000 * k as u64;
        }
        bars[last].close += 20.0;
        bars[last].high = bars[last].close + 1.0;
        bars[last].volume = 2_500_000;
        BarStore::new("7203.T", bars)
    }

    #[test]
    fn uptrend_breakout_is_a_candidate() {
        let store = breakout_store(300);
        let rec = Screener::default().evaluate("Toyota", &store).unwrap();
        assert_eq!(rec.signal, Signal::Breakout);
        assert_eq!(rec.name, "Toyota");
        assert!(rec.dist_52w < 0.01);
        assert!(rec.adx.is_some() && rec.atr_pct.is_some());
    }

    #[test]
    fn short_history_is_rejected() {
        let store = breakout_store(100);
        assert_eq!(
            Screener::default().evaluate("", &store),
            Err(RejectReason::InsufficientHistory)
        );
        assert!(Screener::default().prefilter(&store).is_ok());
    }

    #[test]
    fn loose_mode_keeps_volume_failures_as_setup() {
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        let bars: Vec<Bar> = (0..300)
            .map(|i| {
                let close = 1000.0 + i as f64 * 2.0;
                Bar {
                    date: start + chrono::Duration::days(i),
                    open: close - 1.0,
                    high: close + 3.0,
                    low: close - 3.0,
                    close,
                    volume: 1_000_000,
                }
            })
            .collect();
        let store = BarStore::new("6758.T", bars);
        // Flat volume fails the participation check.
        assert_eq!(
            Screener::default().evaluate("", &store),
            Err(RejectReason::Volume)
        );
        let loose = Screener::new(ScreenConfig {
            strictness: Strictness::Loose,
            ..ScreenConfig::default()
        });
        let rec = loose.evaluate("", &store).unwrap();
        assert_eq!(rec.signal, Signal::Setup);
        assert_eq!(rec.name, "6758.T");
    }
}
