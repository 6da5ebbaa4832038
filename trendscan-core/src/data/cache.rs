//! In-memory bar cache with a fixed time-to-live.
//!
//! Keyed by normalized symbol. A fresh entry short-circuits all network
//! activity; stale entries are replaced on the next successful fetch.

use super::throttle::Clock;
use crate::domain::BarStore;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

#[derive(Debug, Clone)]
struct CacheEntry {
    stored_at_ms: u64,
    store: Arc<BarStore>,
}

pub struct BarCache {
    ttl_ms: u64,
    clock: Arc<dyn Clock>,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl BarCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl_ms: ttl.as_millis() as u64,
            clock,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Fresh entry for `symbol`, if any.
    pub fn get(&self, symbol: &str) -> Option<Arc<BarStore>> {
        let now = self.clock.now_millis();
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(symbol)
            .filter(|e| now.saturating_sub(e.stored_at_ms) < self.ttl_ms)
            .map(|e| e.store.clone())
    }

    pub fn insert(&self, symbol: &str, store: Arc<BarStore>) {
        let entry = CacheEntry {
            stored_at_ms: self.clock.now_millis(),
            store,
        };
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(symbol.to_string(), entry);
    }

    /// Drop expired entries. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now_millis();
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, e| now.saturating_sub(e.stored_at_ms) < self.ttl_ms);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
