//! Trigger classification for a symbol that passed every gate.

use crate::domain::Bar;
use crate::indicators::{avg_volume, rolling_high, sma_at};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Signal {
    /// Close at or above the prior 20-day high on heavy volume.
    #[serde(rename = "BREAKOUT")]
    Breakout,
    /// Reclaimed the 10-day average on at least average volume.
    #[serde(rename = "REB10D")]
    Rebound10,
    /// Qualifies structurally, no trigger today.
    #[serde(rename = "SETUP")]
    Setup,
}

impl Signal {
    pub fn as_str(self) -> &'static str {
        match self {
            Signal::Breakout => "BREAKOUT",
            Signal::Rebound10 => "REB10D",
            Signal::Setup => "SETUP",
        }
    }

    /// BREAKOUT and REB10D are actionable; SETUP is a watch-list entry.
    pub fn is_trigger(self) -> bool {
        !matches!(self, Signal::Setup)
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trigger price and today's classification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trigger {
    /// Highest high of the 20 sessions ending yesterday.
    pub trigger_20h: Option<f64>,
    pub signal: Signal,
}

pub fn classify(bars: &[Bar], breakout_multiple: f64) -> Trigger {
    let trigger_20h = rolling_high(bars, 20, 1);
    let n = bars.len();
    if n < 2 {
        return Trigger {
            trigger_20h,
            signal: Signal::Setup,
        };
    }
    let (last, prev) = (&bars[n - 1], &bars[n - 2]);
    let vol = last.volume_f64();
    let vma20 = avg_volume(bars, 20, 0);

    let breakout = matches!((trigger_20h, vma20), (Some(t), Some(v))
        if last.close >= t && vol >= v * breakout_multiple);

    let rebound = matches!(
        (sma_at(bars, 10, 1), sma_at(bars, 10, 0), vma20),
        (Some(prev10), Some(sma10), Some(v))
            if prev.close < prev10 && last.close > sma10 && vol >= v
    );

    let signal = if breakout {
        Signal::Breakout
    } else if rebound {
        Signal::Rebound10
    } else {
        Signal::Setup
    };
    Trigger {
        trigger_20h,
        signal,
    }
}
