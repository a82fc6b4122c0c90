//! Tier 1 - in-process LRU cache
//!
//! Fastest tier, per-process only. Bounded to a fixed entry count with
//! least-recently-used eviction and per-entry TTL.

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tracing::debug;

use super::entry::{CacheEntry, CacheKey, CaseStatus};

/// Default Tier 1 capacity in entries
pub const DEFAULT_MAX_ENTRIES: usize = 1000;
/// Default Tier 1 TTL (10 minutes)
pub const DEFAULT_MEMORY_TTL: Duration = Duration::from_secs(600);

/// Snapshot of Tier 1 statistics
#[derive(Debug, Clone, Serialize)]
pub struct MemoryCacheStats {
    pub size: usize,
    pub max_size: usize,
    pub utilization: f64,
    pub total_hits: u64,
    pub expired_entries: usize,
    pub default_ttl_seconds: u64,
}

struct Inner {
    entries: HashMap<CacheKey, CacheEntry>,
    /// Recency index: sequence number -> key. Smallest sequence is the
    /// least recently used entry.
    order: BTreeMap<u64, CacheKey>,
    /// Sequence assigned to each key so stale order slots can be dropped
    seq_of: HashMap<CacheKey, u64>,
    next_seq: u64,
}

impl Inner {
    fn touch(&mut self, key: &CacheKey) {
        if let Some(old_seq) = self.seq_of.get(key).copied() {
            self.order.remove(&old_seq);
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.order.insert(seq, key.clone());
        self.seq_of.insert(key.clone(), seq);
    }

    fn forget(&mut self, key: &CacheKey) {
        if let Some(seq) = self.seq_of.remove(key) {
            self.order.remove(&seq);
        }
        self.entries.remove(key);
    }
}

/// In-memory LRU cache with TTL support
pub struct MemoryCache {
    inner: Mutex<Inner>,
    max_size: usize,
    default_ttl: Duration,
}

impl MemoryCache {
    pub fn new(max_size: usize, default_ttl: Duration) -> Self {
        MemoryCache {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                order: BTreeMap::new(),
                seq_of: HashMap::new(),
                next_seq: 0,
            }),
            max_size,
            default_ttl,
        }
    }

    /// Get a value, dropping it if expired and bumping recency on a hit
    pub fn get(&self, key: &CacheKey) -> Option<serde_json::Value> {
        let mut inner = self.inner.lock();

        let expired = match inner.entries.get(key) {
            Some(entry) => entry.is_expired(),
            None => return None,
        };
        if expired {
            debug!(key = %key, "memory cache entry expired");
            inner.forget(key);
            return None;
        }

        inner.touch(key);
        let entry = inner.entries.get_mut(key)?;
        entry.record_hit();
        Some(entry.value.clone())
    }

    /// Insert a value, evicting the least recently used entry when full
    pub fn set(
        &self,
        key: CacheKey,
        value: serde_json::Value,
        ttl: Option<Duration>,
        case_status: CaseStatus,
    ) {
        let ttl = ttl.unwrap_or(self.default_ttl);
        let entry = CacheEntry::new(value, ttl, case_status);

        let mut inner = self.inner.lock();
        inner.entries.insert(key.clone(), entry);
        inner.touch(&key);

        while inner.entries.len() > self.max_size {
            let oldest = inner.order.iter().next().map(|(_, k)| k.clone());
            match oldest {
                Some(victim) => {
                    debug!(key = %victim, "evicting least recently used entry");
                    inner.forget(&victim);
                }
                None => break,
            }
        }
    }

    /// Remove an entry, returning whether it existed
    pub fn delete(&self, key: &CacheKey) -> bool {
        let mut inner = self.inner.lock();
        let existed = inner.entries.contains_key(key);
        if existed {
            inner.forget(key);
        }
        existed
    }

    /// Drop all entries, returning how many were removed
    pub fn clear(&self) -> usize {
        let mut inner = self.inner.lock();
        let count = inner.entries.len();
        inner.entries.clear();
        inner.order.clear();
        inner.seq_of.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> MemoryCacheStats {
        let inner = self.inner.lock();
        let total_hits = inner.entries.values().map(|e| e.hit_count).sum();
        let expired_entries = inner.entries.values().filter(|e| e.is_expired()).count();
        MemoryCacheStats {
            size: inner.entries.len(),
            max_size: self.max_size,
            utilization: if self.max_size > 0 {
                inner.entries.len() as f64 / self.max_size as f64
            } else {
                0.0
            },
            total_hits,
            expired_entries,
            default_ttl_seconds: self.default_ttl.as_secs(),
        }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES, DEFAULT_MEMORY_TTL)
    }
}

// =============================================================================
// Tests
// =============================================================================
