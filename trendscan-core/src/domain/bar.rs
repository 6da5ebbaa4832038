//! Bar and BarStore: the fundamental market data units.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Daily OHLCV bar. `date` is the exchange-local trading day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Bar {
    /// A bar is storable only if its close is finite and positive.
    pub fn has_usable_close(&self) -> bool {
        self.close.is_finite() && self.close > 0.0
    }

    /// Traded value for the session (close × volume).
    pub fn turnover(&self) -> f64 {
        self.close * self.volume as f64
    }

    /// Volume as `f64` for averaging.
    pub fn volume_f64(&self) -> f64 {
        self.volume as f64
    }

    /// Replace non-finite open/high/low with the close so range arithmetic stays finite.
    fn repaired(mut self) -> Self {
        if !self.open.is_finite() {
            self.open = self.close;
        }
        if !self.high.is_finite() {
            self.high = self.close.max(self.open);
        }
        if !self.low.is_finite() {
            self.low = self.close.min(self.open);
        }
        self
    }
}

/// Immutable, strictly date-ascending bar history for one symbol.
///
/// Built wholesale from provider output on every fetch. Bars with an unusable
/// close are dropped at construction; duplicate dates keep the last bar seen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarStore {
    symbol: String,
    bars: Vec<Bar>,
}

impl BarStore {
    pub fn new(symbol: impl Into<String>, bars: Vec<Bar>) -> Self {
        let mut usable: Vec<Bar> = bars
            .into_iter()
            .filter(Bar::has_usable_close)
            .map(Bar::repaired)
            .collect();
        // Stable sort keeps input order among equal dates, so "last wins" below.
        usable.sort_by_key(|b| b.date);

        let mut deduped: Vec<Bar> = Vec::with_capacity(usable.len());
        for bar in usable {
            match deduped.last_mut() {
                Some(prev) if prev.date == bar.date => *prev = bar,
                _ => deduped.push(bar),
            }
        }

        Self {
            symbol: symbol.into(),
            bars: deduped,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    /// Bar `back` sessions before the latest one (`back = 0` is the latest).
    pub fn back(&self, back: usize) -> Option<&Bar> {
        self.bars.len().checked_sub(back + 1).map(|i| &self.bars[i])
    }

    /// Date of the latest bar.
    pub fn as_of(&self) -> Option<NaiveDate> {
        self.last().map(|b| b.date)
    }

    /// Index of the first bar dated on or after `date`.
    pub fn index_on_or_after(&self, date: NaiveDate) -> Option<usize> {
        let idx = self.bars.partition_point(|b| b.date < date);
        (idx < self.bars.len()).then_some(idx)
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }
}
