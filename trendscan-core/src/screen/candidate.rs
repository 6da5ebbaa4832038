//! The record emitted for every symbol that survives the full filter.

use super::signal::Signal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub symbol: String,
    pub name: String,
    pub date: NaiveDate,
    pub close: f64,
    pub sma10: f64,
    pub sma20: f64,
    pub sma50: f64,
    pub high_52w: f64,
    pub dist_52w: f64,
    pub vol_ma20: f64,
    pub turnover_ma20: f64,
    /// Highest high of the 20 sessions ending yesterday.
    pub trigger_20h: f64,
    pub today_volume: u64,
    pub signal: Signal,
    pub adx: Option<f64>,
    pub plus_di: Option<f64>,
    pub minus_di: Option<f64>,
    /// ATR / close, as a fraction.
    pub atr_pct: Option<f64>,
    pub median_turnover_20: f64,
    pub today_turnover: f64,
}

/// Triggers first, then nearest to the 52-week high, then by symbol.
pub fn candidate_order(a: &CandidateRecord, b: &CandidateRecord) -> Ordering {
    b.signal
        .is_trigger()
        .cmp(&a.signal.is_trigger())
        .then(a.dist_52w.total_cmp(&b.dist_52w))
        .then_with(|| a.symbol.cmp(&b.symbol))
}

pub fn sort_candidates(records: &mut [CandidateRecord]) {
    records.sort_by(candidate_order);
}

#[cfg(test)]
pub(crate) fn sample(symbol: &str, signal: Signal, dist: f64) -> CandidateRecord {
    CandidateRecord {
        symbol: symbol.into(),
        name: symbol.into(),
        date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
        close: 1000.0,
        sma10: 990.0,
        sma20: 980.0,
        sma50: 950.0,
        high_52w: 1000.0 / (1.0 - dist),
        dist_52w: dist,
        vol_ma20: 1e6,
        turnover_ma20: 1e9,
        trigger_20h: 1001.0,
        today_volume: 1_200_000,
        signal,
        adx: Some(30.0),
        plus_di: Some(28.0),
        minus_di: Some(12.0),
        atr_pct: Some(0.021),
        median_turnover_20: 9e8,
        today_turnover: 1.2e9,
    }
}
