//! Fetch configuration and the shared fetch context.

use super::session::SessionState;
use super::throttle::{Clock, RequestGate};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Market-data fetch settings. Every field has a default, so an empty
/// `[fetch]` table is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Simultaneous in-flight chart requests.
    pub max_parallel: usize,
    /// Minimum spacing between chart requests.
    pub min_gap_ms: u64,
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub cache_ttl_secs: u64,
    /// Per-request call timeout.
    pub timeout_secs: u64,
    /// Start on `query2` rather than `query1`.
    pub prefer_query2: bool,
    pub backoff_base_ms: u64,
    pub backoff_jitter_ms: u64,
    /// Cooldown unit after an HTML page where JSON was expected.
    pub html_cooldown_ms: u64,
    /// Cooldown unit after HTTP 401.
    pub unauthorized_cooldown_ms: u64,
    /// Fixed delay after every CSV download.
    pub secondary_delay_ms: u64,
    pub secondary_jitter_ms: u64,
    pub enable_secondary: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_parallel: 6,
            min_gap_ms: 150,
            max_retries: 4,
            cache_ttl_secs: 15 * 60,
            timeout_secs: 20,
            prefer_query2: true,
            backoff_base_ms: 500,
            backoff_jitter_ms: 400,
            html_cooldown_ms: 800,
            unauthorized_cooldown_ms: 1200,
            secondary_delay_ms: 220,
            secondary_jitter_ms: 120,
            enable_secondary: true,
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Backoff before retry `attempt` (0-based): `2^attempt × base + jitter`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.min(16);
        Duration::from_millis(factor * self.backoff_base_ms + jitter(self.backoff_jitter_ms))
    }

    /// Anti-bot cooldown: `unit × (attempt + 1)`.
    pub fn cooldown(&self, unit_ms: u64, attempt: u32) -> Duration {
        Duration::from_millis(unit_ms * (u64::from(attempt) + 1))
    }

    pub fn secondary_delay(&self) -> Duration {
        Duration::from_millis(self.secondary_delay_ms + jitter(self.secondary_jitter_ms))
    }
}

fn jitter(max_ms: u64) -> u64 {
    if max_ms == 0 {
        0
    } else {
        rand::thread_rng().gen_range(0..=max_ms)
    }
}

/// Process-wide fetch state, shared by every provider and worker.
pub struct FetchContext {
    pub gate: RequestGate,
    pub session: SessionState,
    pub clock: Arc<dyn Clock>,
}

impl FetchContext {
    pub fn new(config: &FetchConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            gate: RequestGate::new(
                config.max_parallel,
                Duration::from_millis(config.min_gap_ms),
                clock.clone(),
            ),
            session: SessionState::new(config.prefer_query2),
            clock,
        }
    }
}
