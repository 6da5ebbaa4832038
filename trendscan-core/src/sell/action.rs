//! Sell directives and their tag form (`HOLD`, `SELL_1_2`, `SELL_PCT_30`, ...).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SellAction {
    Hold,
    SellAll,
    SellHalf,
    SellQuarter,
    TrimThird,
    /// Sell `n` percent, 1..=100.
    SellPercent(u8),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown sell action tag: {0}")]
pub struct ParseActionError(pub String);

impl SellAction {
    /// Share of the position to sell as an exact `numerator / denominator`.
    pub fn ratio(self) -> (u64, u64) {
        match self {
            SellAction::Hold => (0, 1),
            SellAction::SellAll => (1, 1),
            SellAction::SellHalf => (1, 2),
            SellAction::SellQuarter => (1, 4),
            SellAction::TrimThird => (1, 3),
            SellAction::SellPercent(p) => (u64::from(p.min(100)), 100),
        }
    }

    pub fn fraction(self) -> f64 {
        let (num, den) = self.ratio();
        num as f64 / den as f64
    }

    pub fn is_sell(self) -> bool {
        !matches!(self, SellAction::Hold)
    }
}

impl fmt::Display for SellAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SellAction::Hold => f.write_str("HOLD"),
            SellAction::SellAll => f.write_str("SELL_ALL"),
            SellAction::SellHalf => f.write_str("SELL_1_2"),
            SellAction::SellQuarter => f.write_str("SELL_1_4"),
            SellAction::TrimThird => f.write_str("TRIM_1_3"),
            SellAction::SellPercent(p) => write!(f, "SELL_PCT_{p}"),
        }
    }
}

impl FromStr for SellAction {
    type Err = ParseActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim().to_ascii_uppercase();
        let action = match tag.as_str() {
            "HOLD" => SellAction::Hold,
            "SELL_ALL" => SellAction::SellAll,
            "SELL_1_2" => SellAction::SellHalf,
            "SELL_1_4" => SellAction::SellQuarter,
            "TRIM_1_3" => SellAction::TrimThird,
            other => match other.strip_prefix("SELL_PCT_").and_then(|p| p.parse::<u8>().ok()) {
                Some(p @ 1..=100) => SellAction::SellPercent(p),
                _ => return Err(ParseActionError(s.to_string())),
            },
        };
        Ok(action)
    }
}

impl TryFrom<String> for SellAction {
    type Error = ParseActionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SellAction> for String {
    fn from(action: SellAction) -> Self {
        action.to_string()
    }
}
