//! Sell-engine thresholds. Every field has a default so an empty `[sell]`
//! table is valid.

use super::action::SellAction;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SellConfig {
    /// Fewer bars than this yields HOLD with "insufficient history".
    pub min_bars: usize,

    pub gap_down_pct: f64,
    pub sharp_drop_pct: f64,

    pub starter_no_breakout_days: usize,
    pub starter_no_gain_days: usize,
    pub starter_min_gain: f64,

    /// Close must fall below `ma_buffer × MA` for MA-based stops.
    pub ma_buffer: f64,

    pub enable_peak_drawdown: bool,
    pub peak_drawdown_pct: f64,
    pub peak_drawdown_action: SellAction,

    pub enable_profit_drawdown: bool,
    pub profit_drawdown_min_pnl: f64,
    pub drawdown_floor: f64,
    pub drawdown_atr_multiple: f64,
    pub drawdown_min: f64,
    pub drawdown_max: f64,

    pub enable_momentum_decay: bool,
    pub rsi_divergence_window: usize,
    pub rsi_price_delta: f64,
    pub macd_down_days: usize,
    pub macd_drop_ratio: f64,
    /// Require momentum signals on several recent sessions, not just today.
    pub momentum_confirm: bool,
    pub confirm_window: usize,
    pub confirm_min_hits: usize,

    pub enable_late_pullback: bool,
    pub late_pullback_day_gain: f64,
    pub late_pullback_from_high: f64,
    pub late_pullback_volume_multiple: f64,
    pub late_pullback_sell_pct: u8,

    pub enable_time_take_profit: bool,
    pub time_take_profit_days: usize,
    pub time_take_profit_lookback: usize,
    pub time_take_profit_sell_pct: u8,

    pub strength_rsi: f64,

    /// When false, `MarketOK` is always reported as true.
    pub market_tailwind: bool,
}

impl Default for SellConfig {
    fn default() -> Self {
        Self {
            min_bars: 60,
            gap_down_pct: 0.02,
            sharp_drop_pct: 0.04,
            starter_no_breakout_days: 10,
            starter_no_gain_days: 15,
            starter_min_gain: 0.05,
            ma_buffer: 0.997,
            enable_peak_drawdown: true,
            peak_drawdown_pct: 0.05,
            peak_drawdown_action: SellAction::SellAll,
            enable_profit_drawdown: true,
            profit_drawdown_min_pnl: 0.10,
            drawdown_floor: 0.05,
            drawdown_atr_multiple: 1.8,
            drawdown_min: 0.03,
            drawdown_max: 0.10,
            enable_momentum_decay: true,
            rsi_divergence_window: 40,
            rsi_price_delta: 0.02,
            macd_down_days: 4,
            macd_drop_ratio: 0.35,
            momentum_confirm: true,
            confirm_window: 3,
            confirm_min_hits: 2,
            enable_late_pullback: true,
            late_pullback_day_gain: 0.06,
            late_pullback_from_high: 0.012,
            late_pullback_volume_multiple: 1.3,
            late_pullback_sell_pct: 33,
            enable_time_take_profit: true,
            time_take_profit_days: 45,
            time_take_profit_lookback: 20,
            time_take_profit_sell_pct: 25,
            strength_rsi: 78.0,
            market_tailwind: true,
        }
    }
}
