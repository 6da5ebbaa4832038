//! Volume confirmation: rising participation, no OBV divergence, breakout
//! follow-through and price/volume harmony on the last two sessions.

use super::config::VolumeConfig;
use crate::domain::Bar;
use crate::indicators::{avg_volume, last_two_swing_highs, obv};

/// Bars the volume stage needs before it can pass at all.
pub fn required_bars(cfg: &VolumeConfig) -> usize {
    60.max(cfg.breakout_lookback + 5)
}

/// VMA(slow) of the window ending at bar `idx`.
fn vma_at(bars: &[Bar], period: usize, idx: usize) -> Option<f64> {
    avg_volume(bars, period, bars.len().checked_sub(idx + 1)?)
}

/// VMA(fast) above VMA(slow) and grown by `fast_growth` over `fast_lookback` bars.
pub fn volume_trend(bars: &[Bar], cfg: &VolumeConfig) -> bool {
    let (Some(fast), Some(slow), Some(fast_ago)) = (
        avg_volume(bars, cfg.fast_period, 0),
        avg_volume(bars, cfg.slow_period, 0),
        avg_volume(bars, cfg.fast_period, cfg.fast_lookback),
    ) else {
        return false;
    };
    fast > slow && fast >= fast_ago * cfg.fast_growth
}

/// Higher high in price at the last two swing highs while OBV fails to confirm.
pub fn bearish_obv_divergence(bars: &[Bar], cfg: &VolumeConfig) -> bool {
    let n = bars.len();
    if n < cfg.obv_lookback.max(30) {
        return false;
    }
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let Some((i1, i2)) = last_two_swing_highs(&closes, n - cfg.obv_lookback) else {
        return false;
    };
    if i2 <= i1 {
        return false;
    }
    let obv = obv(bars);
    let higher_high = closes[i2] > closes[i1] * (1.0 + 1e-6);
    let obv_lagging = obv[i2] <= obv[i1] * (1.0 + cfg.obv_tolerance);
    higher_high && obv_lagging
}

/// Earliest bar in the last `lookback` sessions that closed above the prior
/// `lookback`-bar high (with a 0.01% margin).
pub fn recent_breakout_index(bars: &[Bar], lookback: usize) -> Option<usize> {
    let n = bars.len();
    (n.saturating_sub(lookback).max(1)..n).find(|&i| {
        let prior = bars[i.saturating_sub(lookback)..i]
            .iter()
            .map(|b| b.high)
            .fold(f64::NEG_INFINITY, f64::max);
        bars[i].close > prior * 1.0001
    })
}

/// A recent breakout must have come on heavy volume, and volume must not
/// collapse in the sessions right after it.
pub fn breakout_follow_through(bars: &[Bar], cfg: &VolumeConfig) -> bool {
    let Some(b) = recent_breakout_index(bars, cfg.breakout_lookback) else {
        return true;
    };
    let Some(vma_now) = avg_volume(bars, cfg.slow_period, 0) else {
        return false;
    };
    let vma = |i: usize| vma_at(bars, cfg.slow_period, i).unwrap_or(vma_now);

    if bars[b].volume_f64() < vma(b) * cfg.breakout_multiple {
        return false;
    }
    let end = (b + cfg.hold_days).min(bars.len() - 1);
    (b..=end).all(|i| bars[i].volume_f64() >= vma(i) * cfg.collapse_floor)
}

/// Up days should carry volume, down days should not.
///
/// Today: up day needs vol ≥ floor × VMA20 or ≥ yesterday's volume; down day
/// needs vol ≤ cap × VMA20 or ≤ yesterday's volume. Yesterday is judged with
/// the thresholds widened by 0.05 and no previous-volume escape.
pub fn price_volume_harmony(bars: &[Bar], cfg: &VolumeConfig) -> bool {
    let n = bars.len();
    if n < 2 {
        return false;
    }
    let Some(vma) = avg_volume(bars, cfg.slow_period, 0) else {
        return false;
    };
    let (today, prev) = (&bars[n - 1], &bars[n - 2]);
    let (vol, prev_vol) = (today.volume_f64(), prev.volume_f64());

    if today.close > prev.close && !(vol >= vma * cfg.rise_day_floor || vol >= prev_vol) {
        return false;
    }
    if today.close < prev.close && !(vol <= vma * cfg.fall_day_cap || vol <= prev_vol) {
        return false;
    }

    if n >= 3 {
        let before = &bars[n - 3];
        let Some(vma_prev) = avg_volume(bars, cfg.slow_period, 1) else {
            return true;
        };
        if prev.close > before.close && prev_vol < vma_prev * (cfg.rise_day_floor - 0.05) {
            return false;
        }
        if prev.close < before.close && prev_vol > vma_prev * (cfg.fall_day_cap + 0.05) {
            return false;
        }
    }
    true
}

pub fn passes_volume(bars: &[Bar], cfg: &VolumeConfig) -> bool {
    bars.len() >= required_bars(cfg)
        && volume_trend(bars, cfg)
        && !bearish_obv_divergence(bars, cfg)
        && breakout_follow_through(bars, cfg)
        && price_volume_harmony(bars, cfg)
}
