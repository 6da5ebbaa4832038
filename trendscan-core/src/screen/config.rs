//! Screening configuration. Every field has a default so an empty
//! `[screen]` table is valid.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which trend-confirmation template the full filter applies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendMode {
    /// Moving-average stack + ADX/DI, optional relaxed MACD.
    #[default]
    Hybrid,
    /// Minervini trend template (6 of 7 criteria).
    Minervini,
    /// Moving-average stack + ADX/DI, no MACD at all.
    AdxOnly,
}

impl fmt::Display for TrendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TrendMode::Hybrid => "hybrid",
            TrendMode::Minervini => "minervini",
            TrendMode::AdxOnly => "adx_only",
        };
        f.write_str(s)
    }
}

/// How a failed volume confirmation is treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strictness {
    Strict,
    /// Strict and Normal both reject; they differ only in name today.
    #[default]
    Normal,
    /// Keep the symbol with signal SETUP.
    Loose,
}

impl Strictness {
    pub fn rejects_volume_failure(self) -> bool {
        !matches!(self, Strictness::Loose)
    }
}

/// Turnover-based liquidity gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiquidityConfig {
    pub window: usize,
    pub min_median_turnover: f64,
    pub min_avg_turnover: f64,
    /// Today's turnover ≥ this × median also passes.
    pub surge_multiple: f64,
}

impl Default for LiquidityConfig {
    fn default() -> Self {
        Self {
            window: 20,
            min_median_turnover: 2e8,
            min_avg_turnover: 3e8,
            surge_multiple: 3.0,
        }
    }
}

/// Volume-confirmation thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeConfig {
    pub fast_period: usize,
    pub slow_period: usize,
    /// VMA(fast) must have grown by this factor over `fast_lookback` bars.
    pub fast_growth: f64,
    pub fast_lookback: usize,
    pub obv_lookback: usize,
    pub obv_tolerance: f64,
    pub breakout_lookback: usize,
    pub breakout_multiple: f64,
    /// Sessions after a breakout whose volume must not collapse.
    pub hold_days: usize,
    pub collapse_floor: f64,
    pub rise_day_floor: f64,
    pub fall_day_cap: f64,
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            fast_period: 5,
            slow_period: 20,
            fast_growth: 1.02,
            fast_lookback: 3,
            obv_lookback: 60,
            obv_tolerance: 0.003,
            breakout_lookback: 20,
            breakout_multiple: 1.5,
            hold_days: 2,
            collapse_floor: 0.75,
            rise_day_floor: 0.90,
            fall_day_cap: 1.20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenConfig {
    pub min_price: f64,
    pub prefilter_min_bars: usize,
    pub full_min_bars: usize,
    pub max_dist_52w: f64,
    pub max_dist_52w_early: f64,
    /// Signal classification: BREAKOUT needs volume ≥ this × VMA20.
    pub breakout_volume_multiple: f64,
    pub adx_period: usize,
    pub adx_strong: f64,
    pub ma200_slope_lookback: usize,
    pub trend_mode: TrendMode,
    pub require_macd: bool,
    pub strictness: Strictness,
    pub liquidity: LiquidityConfig,
    pub volume: VolumeConfig,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            min_price: 500.0,
            prefilter_min_bars: 30,
            full_min_bars: 120,
            max_dist_52w: 0.20,
            max_dist_52w_early: 0.35,
            breakout_volume_multiple: 1.5,
            adx_period: 14,
            adx_strong: 25.0,
            ma200_slope_lookback: 10,
            trend_mode: TrendMode::Hybrid,
            require_macd: false,
            strictness: Strictness::Normal,
            liquidity: LiquidityConfig::default(),
            volume: VolumeConfig::default(),
        }
    }
}
