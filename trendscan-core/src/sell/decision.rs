//! Decision output and lot allocation.

use super::action::SellAction;
use crate::domain::Position;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Reference values recorded for audit, keyed by display name.
pub type Refs = BTreeMap<String, f64>;

/// Quantity to sell from one lot. `lot_index` indexes [`Position::lots`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotSale {
    pub lot_index: usize,
    pub quantity: u64,
}

impl fmt::Display for LotSale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lot#{}:{}", self.lot_index, self.quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub action: SellAction,
    pub reasons: Vec<String>,
    pub refs: Refs,
    /// Empty for HOLD.
    pub sell_plan: Vec<LotSale>,
}

impl Decision {
    pub fn hold(reason: impl Into<String>) -> Self {
        Self {
            action: SellAction::Hold,
            reasons: vec![reason.into()],
            refs: Refs::new(),
            sell_plan: Vec::new(),
        }
    }

    pub fn reason_text(&self) -> String {
        self.reasons.join(" | ")
    }

    pub fn plan_text(&self) -> String {
        self.sell_plan
            .iter()
            .map(LotSale::to_string)
            .collect::<Vec<_>>()
            .join(" | ")
    }

    pub fn planned_quantity(&self) -> u64 {
        self.sell_plan.iter().map(|s| s.quantity).sum()
    }
}

/// `ceil(fraction × total)` shares, taken from the most recently purchased
/// lot backwards regardless of tier.
pub fn allocate(position: &Position, action: SellAction) -> Vec<LotSale> {
    let total = position.total_quantity();
    let (num, den) = action.ratio();
    let mut remaining =
        ((u128::from(total) * u128::from(num)).div_ceil(u128::from(den))).min(u128::from(total)) as u64;

    let lots = position.lots();
    let mut order: Vec<usize> = (0..lots.len()).collect();
    // Newest purchase first; same-instant lots go higher tier first.
    order.sort_by(|&a, &b| lots[b].bought_at.cmp(&lots[a].bought_at).then(b.cmp(&a)));

    let mut plan = Vec::new();
    for lot_index in order {
        let lot = &lots[lot_index];
        if remaining == 0 {
            break;
        }
        let take = remaining.min(lot.quantity);
        if take > 0 {
            plan.push(LotSale {
                lot_index,
                quantity: take,
            });
            remaining -= take;
        }
    }
    plan
}
