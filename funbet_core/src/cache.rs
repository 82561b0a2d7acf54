//! Injected TTL cache with per-class expiry
//!
//! Constructed once at startup and passed to whatever needs it; no
//! module-level state. Keys carry a class so odds, scores and stats get
//! their own TTLs from one instance.

use crate::config::CacheConfig;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheClass {
    Odds,
    Scores,
    Stats,
}

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

pub struct TtlCache<V> {
    config: CacheConfig,
    entries: RwLock<HashMap<(CacheClass, String), Entry<V>>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn ttl_for(&self, class: CacheClass) -> Duration {
        match class {
            CacheClass::Odds => self.config.odds_ttl,
            CacheClass::Scores => self.config.scores_ttl,
            CacheClass::Stats => self.config.stats_ttl,
        }
    }

    pub fn get(&self, class: CacheClass, key: &str) -> Option<V> {
        let entries = self.entries.read();
        entries
            .get(&(class, key.to_string()))
            .filter(|e| e.expires_at > Instant::now())
            .map(|e| e.value.clone())
    }

    pub fn put(&self, class: CacheClass, key: &str, value: V) {
        let entry = Entry {
            value,
            expires_at: Instant::now() + self.ttl_for(class),
        };
        self.entries.write().insert((class, key.to_string()), entry);
    }

    /// Drop expired entries; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, e| e.expires_at > now);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
