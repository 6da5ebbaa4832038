//! Position: a symbol held as one or more purchase lots.
//!
//! Lots are ordered by tier, then purchase time. When no lot carries an
//! explicit tier, tiers are inferred from purchase order (starter = 0).

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One discrete purchase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lot {
    pub bought_at: NaiveDateTime,
    pub price: f64,
    pub quantity: u64,
    pub tier: Option<u32>,
}

impl Lot {
    pub fn new(bought_at: NaiveDateTime, price: f64, quantity: u64, tier: Option<u32>) -> Self {
        Self {
            bought_at,
            price,
            quantity,
            tier,
        }
    }

    /// Resolved tier. Always `Some` once the lot belongs to a [`Position`].
    pub fn tier_or_zero(&self) -> u32 {
        self.tier.unwrap_or(0)
    }
}

/// Read-only position handed to the sell engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    symbol: String,
    lots: Vec<Lot>,
}

impl Position {
    pub fn new(symbol: impl Into<String>, mut lots: Vec<Lot>) -> Self {
        let any_explicit = lots.iter().any(|l| l.tier.is_some());

        // Chronological order first; it is the tie-breaker in every case.
        lots.sort_by_key(|l| l.bought_at);
        if any_explicit {
            // Lots missing a tier take their chronological slot.
            for (i, lot) in lots.iter_mut().enumerate() {
                lot.tier.get_or_insert(i as u32);
            }
            lots.sort_by_key(|l| (l.tier, l.bought_at));
        } else {
            for (i, lot) in lots.iter_mut().enumerate() {
                lot.tier = Some(i as u32);
            }
        }

        Self {
            symbol: symbol.into(),
            lots,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Lots in tier-then-time order. Sell plans index into this slice.
    pub fn lots(&self) -> &[Lot] {
        &self.lots
    }

    pub fn total_quantity(&self) -> u64 {
        self.lots.iter().map(|l| l.quantity).sum()
    }

    /// Quantity-weighted average purchase price.
    pub fn average_cost(&self) -> Option<f64> {
        let qty = self.total_quantity();
        if qty == 0 {
            return None;
        }
        let cost: f64 = self.lots.iter().map(|l| l.price * l.quantity as f64).sum();
        Some(cost / qty as f64)
    }

    /// Number of adds since the starter lot: max(highest tier, lots − 1).
    pub fn add_count(&self) -> u32 {
        let max_tier = self.lots.iter().map(Lot::tier_or_zero).max().unwrap_or(0);
        let by_count = self.lots.len().saturating_sub(1) as u32;
        max_tier.max(by_count)
    }

    pub fn last_purchase(&self) -> Option<NaiveDateTime> {
        self.lots.iter().map(|l| l.bought_at).max()
    }

    /// The tier-0 lot, or the first lot when no lot is tier 0.
    pub fn starter_lot(&self) -> Option<&Lot> {
        self.lots
            .iter()
            .find(|l| l.tier == Some(0))
            .or_else(|| self.lots.first())
    }
}
