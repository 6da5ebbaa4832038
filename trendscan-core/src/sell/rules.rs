//! The exit-rule cascade.
//!
//! Rules run in a fixed priority order against one [`RuleContext`]; the first
//! rule returning a hit decides. A rule may record reference values in `refs`
//! whether or not it fires. Any unavailable input means "does not fire".

use super::action::SellAction;
use super::context::RuleContext;
use super::decision::Refs;
use super::momentum::{confirmed, macd_contraction, rsi_top_divergence};
use crate::indicators::{macd, rolling_high, rsi_series, sma_at};

/// What a firing rule contributes to the decision.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleHit {
    pub action: SellAction,
    pub reasons: Vec<String>,
}

impl RuleHit {
    fn new(action: SellAction, reason: impl Into<String>) -> Self {
        Self {
            action,
            reasons: vec![reason.into()],
        }
    }
}

/// One guard/action pair in the cascade.
///
/// Rules only read the context; they must not depend on evaluation order
/// beyond "earlier rules did not fire".
pub trait SellRule: Send + Sync {
    fn name(&self) -> &'static str;

    fn evaluate(&self, ctx: &RuleContext<'_>, refs: &mut Refs) -> Option<RuleHit>;
}

/// The standard cascade, highest priority first.
pub fn default_rules() -> Vec<Box<dyn SellRule>> {
    vec![
        Box::new(GapDownThroughSma20),
        Box::new(SharpDrop),
        Box::new(StarterTimeStop),
        Box::new(TieredMaStop),
        Box::new(PeakDrawdown),
        Box::new(ProfitDrawdown),
        Box::new(MomentumDecay),
        Box::new(LatePullback),
        Box::new(AtrTrailingStop),
        Box::new(TimeTakeProfit),
        Box::new(StrengthTrim),
        Box::new(TrendIntact),
    ]
}

/// Opened ≥ 2% below SMA20 after closing above it, and stayed below.
pub struct GapDownThroughSma20;

impl SellRule for GapDownThroughSma20 {
    fn name(&self) -> &'static str {
        "gap_down_sma20"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>, _refs: &mut Refs) -> Option<RuleHit> {
        let m20 = ctx.sma20.filter(|m| *m > 0.0)?;
        let gap = (m20 - ctx.last.open) / m20;
        if !(ctx.prev.close > m20 && gap >= ctx.config.gap_down_pct && ctx.last.close < m20) {
            return None;
        }
        let pct = gap * 100.0;
        Some(if ctx.adds == 0 {
            RuleHit::new(
                SellAction::SellAll,
                format!("starter: gap-down {pct:.2}% through 20-day average, closed below"),
            )
        } else {
            RuleHit::new(
                SellAction::SellHalf,
                format!("added position: gap-down {pct:.2}% through 20-day average, halve first"),
            )
        })
    }
}

/// Single-day drop of 4% or more on at least average volume.
pub struct SharpDrop;

impl SellRule for SharpDrop {
    fn name(&self) -> &'static str {
        "sharp_drop"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>, _refs: &mut Refs) -> Option<RuleHit> {
        let vma = ctx.vma20?;
        let change = (ctx.last.close - ctx.prev.close) / ctx.prev.close;
        if change > -ctx.config.sharp_drop_pct || ctx.last.volume_f64() < vma {
            return None;
        }
        let mut hit = RuleHit::new(
            SellAction::SellHalf,
            format!("single-day drop {:.2}% on volume", change * 100.0),
        );
        if ctx.sma20.is_some_and(|m| ctx.last.close < m) {
            hit.reasons.push("closed below 20-day average".into());
        }
        Some(hit)
    }
}

/// A starter position (no adds) that goes nowhere is closed.
pub struct StarterTimeStop;

impl SellRule for StarterTimeStop {
    fn name(&self) -> &'static str {
        "starter_time_stop"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>, _refs: &mut Refs) -> Option<RuleHit> {
        if ctx.adds != 0 {
            return None;
        }
        let cfg = ctx.config;
        let starter = ctx.position.starter_lot()?;
        let entry = ctx.store.index_on_or_after(starter.bought_at.date())?;
        let last = ctx.last_index();
        if entry >= last {
            return None;
        }
        let days = last - entry;

        let no_breakout = days >= cfg.starter_no_breakout_days
            && rolling_high(ctx.bars, 20, 1).is_some_and(|t| ctx.max_close_since(entry) < t)
            && ctx.sma10.is_some_and(|m| ctx.last.close < m);
        if no_breakout {
            return Some(RuleHit::new(
                SellAction::SellAll,
                format!(
                    "starter timed out: {days} sessions without clearing the 20-day high, below 10-day average"
                ),
            ));
        }

        let gain = (ctx.last.close - starter.price) / starter.price;
        if days >= cfg.starter_no_gain_days && gain < cfg.starter_min_gain {
            return Some(RuleHit::new(
                SellAction::SellAll,
                format!(
                    "starter timed out: {days} sessions with gain {:.2}% under {:.0}%",
                    gain * 100.0,
                    cfg.starter_min_gain * 100.0
                ),
            ));
        }
        None
    }
}

/// Moving-average stop whose line depends on how many times the position was added to.
pub struct TieredMaStop;

impl SellRule for TieredMaStop {
    fn name(&self) -> &'static str {
        "tiered_ma_stop"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>, _refs: &mut Refs) -> Option<RuleHit> {
        let below = |ma| ctx.closed_below(ma);
        match ctx.adds {
            0 if below(ctx.sma20) => Some(RuleHit::new(
                SellAction::SellAll,
                "observation tier: close below 20-day average",
            )),
            0 => None,
            1 if below(ctx.sma40) => Some(RuleHit::new(
                SellAction::SellAll,
                "first tier: close below 40-day average, exit",
            )),
            1 if below(ctx.sma30) => Some(RuleHit::new(
                SellAction::SellHalf,
                "first tier: close below 30-day average, halve",
            )),
            1 => None,
            _ if below(ctx.sma30) => Some(RuleHit::new(
                SellAction::SellAll,
                "second tier or above: close below 30-day average, exit",
            )),
            _ if below(ctx.sma20) => Some(RuleHit::new(
                SellAction::SellHalf,
                "second tier or above: close below 20-day average, halve",
            )),
            _ => None,
        }
    }
}

/// Fixed drawdown from the highest high since the most recent purchase.
pub struct PeakDrawdown;

impl SellRule for PeakDrawdown {
    fn name(&self) -> &'static str {
        "peak_drawdown"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>, refs: &mut Refs) -> Option<RuleHit> {
        let cfg = ctx.config;
        if !cfg.enable_peak_drawdown || !ctx.pnl.is_some_and(|p| p > 0.0) {
            return None;
        }
        let peak = ctx.max_high_since(ctx.last_entry_index);
        if peak <= 0.0 {
            return None;
        }
        let dd = (peak - ctx.last.close) / peak;
        refs.insert("PeakHigh".into(), peak);
        refs.insert("Drawdown%".into(), dd * 100.0);
        (dd >= cfg.peak_drawdown_pct).then(|| {
            RuleHit::new(
                cfg.peak_drawdown_action,
                format!(
                    "peak drawdown: {:.2}% off the high since last purchase (limit {:.2}%)",
                    dd * 100.0,
                    cfg.peak_drawdown_pct * 100.0
                ),
            )
        })
    }
}

/// ATR-scaled drawdown once the position shows a solid profit.
pub struct ProfitDrawdown;

impl SellRule for ProfitDrawdown {
    fn name(&self) -> &'static str {
        "profit_drawdown"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>, refs: &mut Refs) -> Option<RuleHit> {
        let cfg = ctx.config;
        let pnl = ctx.pnl.filter(|p| *p >= cfg.profit_drawdown_min_pnl)?;
        if !cfg.enable_profit_drawdown {
            return None;
        }
        let atr = ctx.atr14?;
        let peak = ctx.max_high_since(ctx.last_entry_index);
        if peak <= 0.0 {
            return None;
        }
        let dd = (peak - ctx.last.close) / peak;
        let trigger = cfg
            .drawdown_floor
            .max(cfg.drawdown_atr_multiple * atr / peak)
            .clamp(cfg.drawdown_min, cfg.drawdown_max);
        refs.insert("PeakHigh".into(), peak);
        refs.insert("Drawdown%".into(), dd * 100.0);
        refs.insert("DDTrig%".into(), trigger * 100.0);
        if dd < trigger {
            return None;
        }
        let action = if pnl >= 0.20 {
            SellAction::SellHalf
        } else {
            SellAction::SellPercent(30)
        };
        Some(RuleHit::new(
            action,
            format!(
                "profit drawdown: {:.2}% off peak, trigger {:.2}%",
                dd * 100.0,
                trigger * 100.0
            ),
        ))
    }
}

/// RSI top divergence, then MACD histogram contraction.
pub struct MomentumDecay;

impl SellRule for MomentumDecay {
    fn name(&self) -> &'static str {
        "momentum_decay"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>, _refs: &mut Refs) -> Option<RuleHit> {
        let cfg = ctx.config;
        if !cfg.enable_momentum_decay || ctx.bars.len() < 60 {
            return None;
        }
        let last = ctx.last_index();
        let (window, min_hits) = if cfg.momentum_confirm {
            (cfg.confirm_window, cfg.confirm_min_hits)
        } else {
            (1, 1)
        };
        let suffix = if cfg.momentum_confirm {
            format!(" ({min_hits} of last {window} sessions)")
        } else {
            String::new()
        };

        let rsi = rsi_series(ctx.bars, 14);
        let divergence = |i| {
            rsi_top_divergence(ctx.bars, &rsi, i, cfg.rsi_divergence_window, cfg.rsi_price_delta)
        };
        if confirmed(last, window, min_hits, divergence) {
            return Some(RuleHit::new(
                SellAction::TrimThird,
                format!("momentum decay: RSI top divergence{suffix}"),
            ));
        }

        let hist = macd(ctx.bars, 12, 26, 9).histogram;
        let contraction = |i| macd_contraction(&hist, i, cfg.macd_down_days, cfg.macd_drop_ratio);
        if confirmed(last, window, min_hits, contraction) {
            return Some(RuleHit::new(
                SellAction::SellPercent(30),
                format!("momentum decay: MACD histogram contracting{suffix}"),
            ));
        }
        None
    }
}

/// Daily proxy for an intraday reversal: big up day that closed well off its
/// high on heavy volume.
pub struct LatePullback;

impl SellRule for LatePullback {
    fn name(&self) -> &'static str {
        "late_pullback"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>, _refs: &mut Refs) -> Option<RuleHit> {
        let cfg = ctx.config;
        if !cfg.enable_late_pullback {
            return None;
        }
        let vma = ctx.vma20?;
        let gain = (ctx.last.close - ctx.prev.close) / ctx.prev.close;
        let off_high = if ctx.last.high > 0.0 {
            (ctx.last.high - ctx.last.close) / ctx.last.high
        } else {
            0.0
        };
        let heavy = ctx.last.volume_f64() >= vma * cfg.late_pullback_volume_multiple;
        (gain >= cfg.late_pullback_day_gain && off_high >= cfg.late_pullback_from_high && heavy)
            .then(|| {
                RuleHit::new(
                    SellAction::SellPercent(cfg.late_pullback_sell_pct),
                    format!(
                        "late pullback: up {:.2}%, {:.2}% off the high, volume ≥ {:.2}x",
                        gain * 100.0,
                        off_high * 100.0,
                        cfg.late_pullback_volume_multiple
                    ),
                )
            })
    }
}

/// Trailing line that tightens as profit grows.
pub fn trail_line(ctx: &RuleContext<'_>) -> Option<f64> {
    let atr = ctx.atr14?;
    let close = ctx.last.close;
    let (ma, mult) = match ctx.pnl {
        Some(p) if p >= 0.20 => (ctx.sma10?, 1.3),
        Some(p) if p >= 0.10 => (ctx.sma15?, 1.7),
        _ => (ctx.sma20?, 2.0),
    };
    Some(ma.max(close - mult * atr))
}

pub struct AtrTrailingStop;

impl SellRule for AtrTrailingStop {
    fn name(&self) -> &'static str {
        "atr_trailing_stop"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>, refs: &mut Refs) -> Option<RuleHit> {
        let trail = trail_line(ctx)?;
        refs.insert("Trail".into(), trail);
        if !ctx.closed_below(Some(trail)) {
            return None;
        }
        let action = match ctx.pnl {
            Some(p) if p >= 0.20 => SellAction::SellHalf,
            Some(p) if p >= 0.10 => SellAction::TrimThird,
            _ => SellAction::SellQuarter,
        };
        Some(RuleHit::new(action, "close below ATR trailing line"))
    }
}

/// Long holding without a new high: take some off the table.
pub struct TimeTakeProfit;

impl SellRule for TimeTakeProfit {
    fn name(&self) -> &'static str {
        "time_take_profit"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>, _refs: &mut Refs) -> Option<RuleHit> {
        let cfg = ctx.config;
        if !cfg.enable_time_take_profit {
            return None;
        }
        let held = ctx.last_index() - ctx.last_entry_index.min(ctx.last_index());
        let high = rolling_high(ctx.bars, cfg.time_take_profit_lookback, 0)?;
        (held >= cfg.time_take_profit_days && ctx.last.close < high).then(|| {
            RuleHit::new(
                SellAction::SellPercent(cfg.time_take_profit_sell_pct),
                format!(
                    "time take-profit: held {held} sessions without a new {}-day high",
                    cfg.time_take_profit_lookback
                ),
            )
        })
    }
}

/// Two closes above the upper Bollinger band with RSI overbought.
pub struct StrengthTrim;

impl SellRule for StrengthTrim {
    fn name(&self) -> &'static str {
        "strength_trim"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>, _refs: &mut Refs) -> Option<RuleHit> {
        let upper = ctx.bollinger?.upper;
        let rsi = ctx.rsi14?;
        (ctx.last.close > upper && ctx.prev.close > upper && rsi >= ctx.config.strength_rsi).then(
            || RuleHit::new(SellAction::TrimThird, "two closes above upper band with RSI high"),
        )
    }
}

/// Terminal rule: hold, with market tailwind and re-add hints recorded.
pub struct TrendIntact;

impl TrendIntact {
    /// Close above SMA50 and SMA200 with SMA200 rising. Short histories pass.
    pub fn market_ok(ctx: &RuleContext<'_>) -> bool {
        if !ctx.config.market_tailwind || ctx.bars.len() < 210 {
            return true;
        }
        let close = ctx.last.close;
        match (
            sma_at(ctx.bars, 50, 0),
            sma_at(ctx.bars, 200, 0),
            sma_at(ctx.bars, 200, 1),
        ) {
            (Some(m50), Some(m200), Some(m200_prev)) => {
                close > m50 && close > m200 && m200 > m200_prev
            }
            _ => false,
        }
    }
}

impl SellRule for TrendIntact {
    fn name(&self) -> &'static str {
        "trend_intact"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>, refs: &mut Refs) -> Option<RuleHit> {
        let readd = matches!((ctx.sma10, ctx.vma20), (Some(m10), Some(v))
            if ctx.last.close > m10 && ctx.last.volume_f64() >= v);
        let flag = |b: bool| if b { 1.0 } else { 0.0 };
        refs.insert("ReAddSignal".into(), flag(readd));
        refs.insert("MarketOK".into(), flag(Self::market_ok(ctx)));
        Some(RuleHit::new(SellAction::Hold, "trend intact"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Bar, BarStore, Lot, Position};
    use crate::indicators::make_bars;
    use crate::sell::SellConfig;

    fn store(bars: Vec<Bar>) -> BarStore {
        BarStore::new("7203.T", bars)
    }

    /// One lot per `(bar index, price)`, bought mid-session on that bar's date.
    fn held(store: &BarStore, lots: &[(usize, f64)]) -> Position {
        let lots = lots
            .iter()
            .map(|&(i, price)| {
                let at = store.bars()[i].date.and_hms_opt(10, 0, 0).unwrap();
                Lot::new(at, price, 100, None)
            })
            .collect();
        Position::new(store.symbol(), lots)
    }

    fn run(
        rule: &dyn SellRule,
        position: &Position,
        store: &BarStore,
        config: &SellConfig,
    ) -> (Option<RuleHit>, Refs) {
        let ctx = RuleContext::new(position, store, config).unwrap();
        let mut refs = Refs::new();
        let hit = rule.evaluate(&ctx, &mut refs);
        (hit, refs)
    }

    fn fire(rule: &dyn SellRule, position: &Position, store: &BarStore) -> Option<RuleHit> {
        run(rule, position, store, &SellConfig::default()).0
    }

    // ── Sharp drop ───────────────────────────────────────────────────

    fn drop_to(last: f64, last_volume: u64) -> BarStore {
        let mut closes = vec![100.0; 59];
        closes.push(last);
        let mut bars = make_bars(&closes);
        bars[59].volume = last_volume;
        store(bars)
    }

    #[test]
    fn sharp_drop_on_volume_halves() {
        let s = drop_to(96.0, 1000);
        let hit = fire(&SharpDrop, &held(&s, &[(0, 90.0)]), &s).unwrap();
        assert_eq!(hit.action, SellAction::SellHalf);
        assert_eq!(hit.reasons[0], "single-day drop -4.00% on volume");
        assert_eq!(hit.reasons[1], "closed below 20-day average");
    }

    #[test]
    fn sharp_drop_needs_depth_and_volume() {
        let s = drop_to(96.5, 1000);
        assert_eq!(fire(&SharpDrop, &held(&s, &[(0, 90.0)]), &s), None);
        // 999 shares against a 999.95 average.
        let s = drop_to(96.0, 999);
        assert_eq!(fire(&SharpDrop, &held(&s, &[(0, 90.0)]), &s), None);
    }

    // ── Starter time stop ────────────────────────────────────────────

    /// A shelf at 120, then a base at 100 that never gets back up.
    fn stalled_base() -> BarStore {
        let mut closes = vec![120.0; 25];
        closes.extend([100.0; 14]);
        closes.push(99.5);
        store(make_bars(&closes))
    }

    fn slow_grind() -> BarStore {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + 0.2 * i as f64).collect();
        store(make_bars(&closes))
    }

    #[test]
    fn starter_without_breakout_is_closed() {
        let s = stalled_base();
        let hit = fire(&StarterTimeStop, &held(&s, &[(28, 100.0)]), &s).unwrap();
        assert_eq!(hit.action, SellAction::SellAll);
        assert!(hit.reasons[0].contains("11 sessions without clearing the 20-day high"));
    }

    #[test]
    fn starter_without_breakout_gets_ten_sessions() {
        let s = stalled_base();
        assert_eq!(fire(&StarterTimeStop, &held(&s, &[(30, 100.0)]), &s), None);
    }

    #[test]
    fn starter_without_gain_is_closed() {
        let s = slow_grind();
        let hit = fire(&StarterTimeStop, &held(&s, &[(20, 104.0)]), &s).unwrap();
        assert_eq!(hit.action, SellAction::SellAll);
        assert!(hit.reasons[0].contains("19 sessions with gain 3.65% under 5%"));
    }

    #[test]
    fn starter_without_gain_gets_fifteen_sessions() {
        let s = slow_grind();
        assert_eq!(fire(&StarterTimeStop, &held(&s, &[(25, 105.0)]), &s), None);
    }

    #[test]
    fn added_positions_skip_the_starter_stop() {
        let s = stalled_base();
        let pos = held(&s, &[(28, 100.0), (29, 100.0)]);
        assert_eq!(fire(&StarterTimeStop, &pos, &s), None);
    }

    // ── Momentum decay ───────────────────────────────────────────────

    /// Rally to 150, pull back to 130, rally to a marginal new high at 157
    /// with less RSI behind it.
    fn divergent_top(last: f64) -> BarStore {
        let mut closes = vec![100.0; 51];
        closes.extend((1..=10).map(|k| 100.0 + 5.0 * k as f64));
        closes.extend((1..=10).map(|k| 150.0 - 2.0 * k as f64));
        closes.extend((1..=8).map(|k| 130.0 + 3.0 * k as f64));
        closes.push(last);
        store(make_bars(&closes))
    }

    /// Fast climb, then a sharp slowdown that bleeds the MACD histogram.
    fn stalling_climb() -> BarStore {
        let mut closes = vec![100.0; 40];
        closes.extend((1..=25).map(|k| 100.0 + 3.0 * k as f64));
        closes.extend((1..=4).map(|k| 175.0 + k as f64));
        store(make_bars(&closes))
    }

    #[test]
    fn rsi_divergence_trims_a_third() {
        let s = divergent_top(157.0);
        let pos = held(&s, &[(0, 100.0)]);
        let hit = fire(&MomentumDecay, &pos, &s).unwrap();
        assert_eq!(hit.action, SellAction::TrimThird);
        assert_eq!(
            hit.reasons[0],
            "momentum decay: RSI top divergence (2 of last 3 sessions)"
        );

        let single_day = SellConfig {
            momentum_confirm: false,
            ..SellConfig::default()
        };
        let (hit, _) = run(&MomentumDecay, &pos, &s, &single_day);
        assert_eq!(hit.unwrap().reasons[0], "momentum decay: RSI top divergence");
    }

    #[test]
    fn rsi_divergence_needs_a_clear_new_high() {
        // 152 is under 2% above the 150 pivot, leaving one divergent session.
        let s = divergent_top(152.0);
        assert_eq!(fire(&MomentumDecay, &held(&s, &[(0, 100.0)]), &s), None);
    }

    #[test]
    fn macd_contraction_sells_thirty_percent() {
        let s = stalling_climb();
        let hit = fire(&MomentumDecay, &held(&s, &[(0, 100.0)]), &s).unwrap();
        assert_eq!(hit.action, SellAction::SellPercent(30));
        assert_eq!(
            hit.reasons[0],
            "momentum decay: MACD histogram contracting (2 of last 3 sessions)"
        );
    }

    #[test]
    fn macd_contraction_confirmation_window() {
        let s = stalling_climb();
        let pos = held(&s, &[(0, 100.0)]);
        // A deeper drop requirement leaves only today contracting enough.
        let deep = SellConfig {
            macd_drop_ratio: 0.5,
            ..SellConfig::default()
        };
        assert_eq!(run(&MomentumDecay, &pos, &s, &deep).0, None);

        let deep_single_day = SellConfig {
            momentum_confirm: false,
            ..deep
        };
        let hit = run(&MomentumDecay, &pos, &s, &deep_single_day).0.unwrap();
        assert_eq!(hit.action, SellAction::SellPercent(30));
        assert_eq!(hit.reasons[0], "momentum decay: MACD histogram contracting");
    }

    #[test]
    fn momentum_decay_can_be_disabled() {
        let s = divergent_top(157.0);
        let off = SellConfig {
            enable_momentum_decay: false,
            ..SellConfig::default()
        };
        assert_eq!(run(&MomentumDecay, &held(&s, &[(0, 100.0)]), &s, &off).0, None);
    }

    // ── Late pullback ────────────────────────────────────────────────

    fn spike(high: Option<f64>, volume: u64) -> BarStore {
        let mut closes = vec![100.0; 29];
        closes.push(107.0);
        let mut bars = make_bars(&closes);
        if let Some(h) = high {
            bars[29].high = h;
        }
        bars[29].volume = volume;
        store(bars)
    }

    #[test]
    fn late_pullback_sells_a_third() {
        let s = spike(Some(109.0), 2000);
        let hit = fire(&LatePullback, &held(&s, &[(0, 100.0)]), &s).unwrap();
        assert_eq!(hit.action, SellAction::SellPercent(33));
        assert!(hit.reasons[0].starts_with("late pullback: up 7.00%, 1.83% off the high"));
    }

    #[test]
    fn late_pullback_needs_fade_and_volume() {
        // Closed within 1% of the high.
        let s = spike(None, 2000);
        assert_eq!(fire(&LatePullback, &held(&s, &[(0, 100.0)]), &s), None);
        // 1300 shares against a 1.3 × 1015 requirement.
        let s = spike(Some(109.0), 1300);
        assert_eq!(fire(&LatePullback, &held(&s, &[(0, 100.0)]), &s), None);
    }

    // ── ATR trailing stop ────────────────────────────────────────────

    fn rally_closing_at(last: f64) -> BarStore {
        let mut closes: Vec<f64> = (0..59).map(|i| 100.0 + i as f64).collect();
        closes.push(last);
        store(make_bars(&closes))
    }

    #[test]
    fn trail_action_scales_with_profit() {
        let s = rally_closing_at(150.0);
        let (hit, refs) = run(
            &AtrTrailingStop,
            &held(&s, &[(0, 100.0)]),
            &s,
            &SellConfig::default(),
        );
        assert_eq!(hit.unwrap().action, SellAction::SellHalf);
        assert!((refs["Trail"] - 153.6).abs() < 1e-9);

        let hit = fire(&AtrTrailingStop, &held(&s, &[(0, 130.0)]), &s).unwrap();
        assert_eq!(hit.action, SellAction::TrimThird);

        let s = rally_closing_at(140.0);
        let hit = fire(&AtrTrailingStop, &held(&s, &[(0, 135.0)]), &s).unwrap();
        assert_eq!(hit.action, SellAction::SellQuarter);
        assert_eq!(hit.reasons[0], "close below ATR trailing line");
    }

    #[test]
    fn trail_respects_the_buffer() {
        // Trail 153.96; 153.6 sits above 0.997 × trail.
        let s = rally_closing_at(153.6);
        let (hit, refs) = run(
            &AtrTrailingStop,
            &held(&s, &[(0, 100.0)]),
            &s,
            &SellConfig::default(),
        );
        assert_eq!(hit, None);
        assert!((refs["Trail"] - 153.96).abs() < 1e-9);
    }

    // ── Time take-profit ─────────────────────────────────────────────

    fn long_hold() -> Vec<Bar> {
        let closes: Vec<f64> = (0..70).map(|i| 100.0 + 0.5 * i as f64).collect();
        make_bars(&closes)
    }

    #[test]
    fn time_take_profit_after_long_hold() {
        let s = store(long_hold());
        let hit = fire(&TimeTakeProfit, &held(&s, &[(10, 105.0)]), &s).unwrap();
        assert_eq!(hit.action, SellAction::SellPercent(25));
        assert_eq!(
            hit.reasons[0],
            "time take-profit: held 59 sessions without a new 20-day high"
        );
    }

    #[test]
    fn time_take_profit_boundaries() {
        let s = store(long_hold());
        assert_eq!(fire(&TimeTakeProfit, &held(&s, &[(25, 112.5)]), &s), None);

        // Closing on the high of the window is a new high.
        let mut bars = long_hold();
        bars[69].close = 140.0;
        bars[69].high = 140.0;
        let s = store(bars);
        assert_eq!(fire(&TimeTakeProfit, &held(&s, &[(10, 105.0)]), &s), None);
    }

    // ── Strength trim ────────────────────────────────────────────────

    /// Flat at 100 with one dip of `dip`, then two closes far above the band.
    fn blow_off(dip: f64) -> BarStore {
        let mut closes = vec![100.0; 30];
        closes.push(100.0 - dip);
        closes.extend([100.0; 7]);
        closes.extend([110.0, 112.0]);
        store(make_bars(&closes))
    }

    #[test]
    fn strength_trim_above_band_with_rsi_high() {
        // Gains 16 against losses 4: RSI 80.
        let s = blow_off(4.0);
        let hit = fire(&StrengthTrim, &held(&s, &[(0, 100.0)]), &s).unwrap();
        assert_eq!(hit.action, SellAction::TrimThird);
    }

    #[test]
    fn strength_trim_needs_rsi_at_threshold() {
        // Gains 17 against losses 5: RSI 77.3.
        let s = blow_off(5.0);
        assert_eq!(fire(&StrengthTrim, &held(&s, &[(0, 100.0)]), &s), None);
    }

    #[test]
    fn strength_trim_needs_two_closes_above_band() {
        let mut closes = vec![100.0; 39];
        closes.push(115.0);
        let s = store(make_bars(&closes));
        assert_eq!(fire(&StrengthTrim, &held(&s, &[(0, 100.0)]), &s), None);
    }

    // ── Peak drawdown ────────────────────────────────────────────────

    #[test]
    fn peak_drawdown_boundary() {
        // Prior bar 138 → 139 puts the peak high at 140.
        let closes: Vec<f64> = (0..59).map(|i| 81.0 + i as f64).chain([133.0]).collect();
        let s = store(make_bars(&closes));
        let pos = held(&s, &[(40, 106.4)]);
        let (hit, refs) = run(&PeakDrawdown, &pos, &s, &SellConfig::default());
        assert_eq!(hit.unwrap().action, SellAction::SellAll);
        assert_eq!(refs["PeakHigh"], 140.0);

        let closes: Vec<f64> = (0..59).map(|i| 81.0 + i as f64).chain([133.5]).collect();
        let s = store(make_bars(&closes));
        assert_eq!(fire(&PeakDrawdown, &held(&s, &[(40, 106.4)]), &s), None);
    }
}
