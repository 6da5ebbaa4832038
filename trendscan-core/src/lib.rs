//! TrendScan Core: market data, indicators, trend screening and sell decisions.
//!
//! This crate contains everything that runs per symbol:
//! - Domain types (bars, bar stores, lots, positions)
//! - Throttled market-data fetching with a primary and fallback provider
//! - Indicator library over daily bars
//! - Trend screening pipeline (prefilter, structure, trend, volume, signal)
//! - Sell-decision rule cascade with lot allocation
//!
//! Concurrency, configuration files and CSV output live in `trendscan-runner`.

pub mod data;
pub mod domain;
pub mod indicators;
pub mod screen;
pub mod sell;
