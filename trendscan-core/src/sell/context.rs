//! Immutable snapshot every sell rule evaluates against.

use super::config::SellConfig;
use super::decision::Refs;
use crate::domain::{Bar, BarStore, Position};
use crate::indicators::{atr_at, avg_volume, bollinger_at, rsi_at, sma_at, BollingerBands};

pub struct RuleContext<'a> {
    pub bars: &'a [Bar],
    pub store: &'a BarStore,
    pub position: &'a Position,
    pub config: &'a SellConfig,
    pub last: Bar,
    pub prev: Bar,
    pub sma10: Option<f64>,
    pub sma15: Option<f64>,
    pub sma20: Option<f64>,
    pub sma30: Option<f64>,
    pub sma40: Option<f64>,
    pub atr14: Option<f64>,
    pub vma20: Option<f64>,
    pub rsi14: Option<f64>,
    pub bollinger: Option<BollingerBands>,
    pub avg_cost: Option<f64>,
    /// `(close − avg cost) / avg cost`.
    pub pnl: Option<f64>,
    pub adds: u32,
    /// Full-exit reference line: SMA20 for 0/1 adds, SMA15 from 2 adds.
    pub loss_ma: Option<f64>,
    /// First bar on or after the most recent purchase (0 if none).
    pub last_entry_index: usize,
}

impl<'a> RuleContext<'a> {
    /// `None` with fewer than two bars.
    pub fn new(position: &'a Position, store: &'a BarStore, config: &'a SellConfig) -> Option<Self> {
        let bars = store.bars();
        let last = *store.back(0)?;
        let prev = *store.back(1)?;

        let sma20 = sma_at(bars, 20, 0);
        let sma15 = sma_at(bars, 15, 0);
        let avg_cost = position.average_cost();
        let pnl = avg_cost
            .filter(|c| *c > 0.0)
            .map(|c| (last.close - c) / c);
        let adds = position.add_count();
        let last_entry_index = position
            .last_purchase()
            .and_then(|at| store.index_on_or_after(at.date()))
            .unwrap_or(0);

        Some(Self {
            bars,
            store,
            position,
            config,
            last,
            prev,
            sma10: sma_at(bars, 10, 0),
            sma15,
            sma20,
            sma30: sma_at(bars, 30, 0),
            sma40: sma_at(bars, 40, 0),
            atr14: atr_at(bars, 14, 0),
            vma20: avg_volume(bars, 20, 0),
            rsi14: rsi_at(bars, 14, 0),
            bollinger: bollinger_at(bars, 20, 2.0, 0),
            avg_cost,
            pnl,
            adds,
            loss_ma: if adds >= 2 { sma15 } else { sma20 },
            last_entry_index,
        })
    }

    pub fn last_index(&self) -> usize {
        self.bars.len() - 1
    }

    /// Close below `buffer × ma`. An unavailable MA never triggers.
    pub fn closed_below(&self, ma: Option<f64>) -> bool {
        ma.is_some_and(|m| self.last.close < m * self.config.ma_buffer)
    }

    /// Highest high from `from` through the latest bar.
    pub fn max_high_since(&self, from: usize) -> f64 {
        self.bars[from.min(self.last_index())..]
            .iter()
            .map(|b| b.high)
            .fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn max_close_since(&self, from: usize) -> f64 {
        self.bars[from.min(self.last_index())..]
            .iter()
            .map(|b| b.close)
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// Snapshot values every decision carries.
    pub fn base_refs(&self) -> Refs {
        let mut refs = Refs::new();
        let mut put = |k: &str, v: Option<f64>| {
            if let Some(v) = v {
                refs.insert(k.to_string(), v);
            }
        };
        put("M10", self.sma10);
        put("M15", self.sma15);
        put("M20", self.sma20);
        put("ATR14", self.atr14);
        put("RSI14", self.rsi14);
        put("AvgCost", self.avg_cost);
        put("PnL%", self.pnl.map(|p| p * 100.0));
        put("Adds", Some(f64::from(self.adds)));
        put("LossMA", self.loss_ma);
        refs
    }
}
