//! Sell-decision engine for held positions.
//!
//! A [`SellEngine`] evaluates an ordered cascade of [`SellRule`]s against one
//! position and its bar history. The first rule that fires decides the
//! action; sell actions are then allocated to lots, most recent lot first.
//! Decisions are a pure function of (position, bars, config).

pub mod action;
pub mod config;
pub mod context;
pub mod decision;
pub mod momentum;
pub mod rules;

pub use action::{ParseActionError, SellAction};
pub use config::SellConfig;
pub use context::RuleContext;
pub use decision::{allocate, Decision, LotSale, Refs};
pub use rules::{default_rules, RuleHit, SellRule};

use crate::domain::{BarStore, Position};
use tracing::debug;

pub struct SellEngine {
    config: SellConfig,
    rules: Vec<Box<dyn SellRule>>,
}

impl SellEngine {
    pub fn new(config: SellConfig) -> Self {
        Self::with_rules(config, default_rules())
    }

    /// Engine with a custom cascade, evaluated in the given order.
    pub fn with_rules(config: SellConfig, rules: Vec<Box<dyn SellRule>>) -> Self {
        Self { config, rules }
    }

    pub fn config(&self) -> &SellConfig {
        &self.config
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    pub fn decide(&self, position: &Position, store: &BarStore) -> Decision {
        if store.len() < self.config.min_bars.max(2) {
            return Decision::hold("insufficient history");
        }
        let Some(ctx) = RuleContext::new(position, store, &self.config) else {
            return Decision::hold("insufficient history");
        };

        let mut refs = ctx.base_refs();
        for rule in &self.rules {
            let Some(hit) = rule.evaluate(&ctx, &mut refs) else {
                continue;
            };
            debug!(
                symbol = position.symbol(),
                rule = rule.name(),
                action = %hit.action,
                "sell rule fired"
            );
            let sell_plan = if hit.action.is_sell() {
                allocate(position, hit.action)
            } else {
                Vec::new()
            };
            return Decision {
                action: hit.action,
                reasons: hit.reasons,
                refs,
                sell_plan,
            };
        }

        let mut decision = Decision::hold("trend intact");
        decision.refs = refs;
        decision
    }
}

impl Default for SellEngine {
    fn default() -> Self {
        Self::new(SellConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Lot;
    use crate::indicators::make_bars;
    use chrono::{Duration, NaiveDateTime};

    /// 99 bars rising by 1 from 100, then `last` on thin volume.
    fn rally_then(last: f64) -> BarStore {
        let mut closes: Vec<f64> = (0..99).map(|i| 100.0 + i as f64).collect();
        closes.push(last);
        let mut bars = make_bars(&closes);
        bars[99].volume = 500;
        BarStore::new("6758.T", bars)
    }

    fn bought_on(store: &BarStore, index: usize) -> NaiveDateTime {
        (store.bars()[0].date + Duration::days(index as i64))
            .and_hms_opt(9, 30, 0)
            .unwrap()
    }

    fn position(store: &BarStore, lots: &[(usize, f64, u64)]) -> Position {
        let lots = lots
            .iter()
            .map(|&(i, price, qty)| Lot::new(bought_on(store, i), price, qty, None))
            .collect();
        Position::new(store.symbol(), lots)
    }

    #[test]
    fn short_history_holds() {
        let store = BarStore::new("6758.T", make_bars(&[100.0; 30]));
        let pos = position(&store, &[(0, 100.0, 100)]);
        let d = SellEngine::default().decide(&pos, &store);
        assert_eq!(d.action, SellAction::Hold);
        assert_eq!(d.reason_text(), "insufficient history");
        assert!(d.sell_plan.is_empty());
    }

    #[test]
    fn starter_below_sma20_exits_fully() {
        let store = rally_then(185.0);
        let pos = position(&store, &[(97, 190.0, 300)]);
        let d = SellEngine::default().decide(&pos, &store);
        assert_eq!(d.action, SellAction::SellAll);
        assert!(d.reason_text().contains("20-day average"));
        assert_eq!(d.planned_quantity(), 300);
        assert_eq!(d.refs.get("Adds"), Some(&0.0));
    }

    #[test]
    fn gap_down_outranks_ma_stop() {
        let mut bars = rally_then(185.0).bars().to_vec();
        bars[99].open = 180.0;
        let store = BarStore::new("6758.T", bars);
        let pos = position(&store, &[(97, 190.0, 300)]);
        let d = SellEngine::default().decide(&pos, &store);
        assert_eq!(d.action, SellAction::SellAll);
        assert!(d.reason_text().contains("gap-down"), "{}", d.reason_text());
    }

    #[test]
    fn peak_drawdown_fires_when_ma_stop_does_not() {
        let store = rally_then(189.0);
        let pos = position(&store, &[(80, 150.0, 100), (95, 170.0, 100)]);
        let d = SellEngine::default().decide(&pos, &store);
        assert_eq!(d.action, SellAction::SellAll);
        assert!(d.reason_text().starts_with("peak drawdown"));
        assert_eq!(d.refs.get("PeakHigh"), Some(&199.0));
        assert_eq!(d.planned_quantity(), 200);
        // Most recent lot is sold first.
        assert_eq!(d.sell_plan[0].lot_index, 1);
    }

    #[test]
    fn steady_trend_holds_with_hints() {
        let closes: Vec<f64> = (0..100).map(|i| 100.0 + i as f64).collect();
        let store = BarStore::new("6758.T", make_bars(&closes));
        let pos = position(&store, &[(98, 198.0, 100)]);
        let config = SellConfig {
            enable_momentum_decay: false,
            ..SellConfig::default()
        };
        let d = SellEngine::new(config).decide(&pos, &store);
        assert_eq!(d.action, SellAction::Hold);
        assert_eq!(d.reason_text(), "trend intact");
        assert_eq!(d.refs.get("MarketOK"), Some(&1.0));
        assert_eq!(d.refs.get("ReAddSignal"), Some(&1.0));
        assert!(d.refs.contains_key("Trail"));
    }

    #[test]
    fn decisions_are_deterministic() {
        let store = rally_then(189.0);
        let pos = position(&store, &[(80, 150.0, 100), (95, 170.0, 100)]);
        let engine = SellEngine::default();
        assert_eq!(engine.decide(&pos, &store), engine.decide(&pos, &store));
    }

    #[test]
    fn custom_cascade_without_terminal_rule_still_holds() {
        let store = rally_then(198.5);
        let pos = position(&store, &[(98, 198.0, 100)]);
        let engine = SellEngine::with_rules(SellConfig::default(), Vec::new());
        let d = engine.decide(&pos, &store);
        assert_eq!(d.action, SellAction::Hold);
        assert!(d.refs.contains_key("M20"));
        assert!(engine.rule_names().is_empty());
    }

    #[test]
    fn default_cascade_order() {
        let names = SellEngine::default().rule_names();
        assert_eq!(names.first(), Some(&"gap_down_sma20"));
        assert_eq!(names.last(), Some(&"trend_intact"));
        assert_eq!(names.len(), 12);
    }
}
