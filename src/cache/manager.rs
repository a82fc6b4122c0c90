//! Multi-tier cache orchestration
//!
//! Tier 1 is the in-process LRU cache and is always the first stop. Tier 2
//! is a shared backend behind [`SharedCacheBackend`] so a distributed store
//! can be plugged in without touching the manager; it is disabled unless a
//! backend is supplied. Hits in the shared tier repopulate Tier 1.
//!
//! TTL strategy for the shared tier follows case status: active cases
//! change often and get 1 hour, closed cases are stable and get 24 hours.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::entry::{CacheKey, CaseStatus};
use super::memory::{MemoryCache, MemoryCacheStats, DEFAULT_MAX_ENTRIES, DEFAULT_MEMORY_TTL};
use crate::error::Result;
use crate::metrics;
use crate::model::{Dimension, Scope};

/// Shared-tier TTL for active cases (1 hour)
pub const ACTIVE_CASE_TTL: Duration = Duration::from_secs(3600);
/// Shared-tier TTL for closed cases (24 hours)
pub const CLOSED_CASE_TTL: Duration = Duration::from_secs(86400);

// =============================================================================
// Shared tier backend
// =============================================================================

/// Tier 2 backend contract. Implementations must be safe to share across
/// tasks.
#[async_trait]
pub trait SharedCacheBackend: Send + Sync {
    async fn get(&self, key: &CacheKey) -> Result<Option<serde_json::Value>>;
    async fn set(&self, key: &CacheKey, value: serde_json::Value, ttl: Duration) -> Result<()>;
    async fn delete(&self, key: &CacheKey) -> Result<bool>;
    /// Backend name for logs and the config endpoint
    fn name(&self) -> &'static str;
}

/// In-memory shared backend. Stands in for a distributed store in tests
/// and single-instance deployments.
#[derive(Default)]
pub struct InMemorySharedBackend {
    entries: DashMap<CacheKey, (serde_json::Value, Instant)>,
}

impl InMemorySharedBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SharedCacheBackend for InMemorySharedBackend {
    async fn get(&self, key: &CacheKey) -> Result<Option<serde_json::Value>> {
        if let Some(entry) = self.entries.get(key) {
            let (value, expires_at) = entry.value();
            if Instant::now() < *expires_at {
                return Ok(Some(value.clone()));
            }
        }
        // Drop expired entries lazily
        self.entries
            .remove_if(key, |_, (_, expires_at)| Instant::now() >= *expires_at);
        Ok(None)
    }

    async fn set(&self, key: &CacheKey, value: serde_json::Value, ttl: Duration) -> Result<()> {
        self.entries
            .insert(key.clone(), (value, Instant::now() + ttl));
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> Result<bool> {
        Ok(self.entries.remove(key).is_some())
    }

    fn name(&self) -> &'static str {
        "in-memory"
    }
}

// =============================================================================
// Configuration & statistics
// =============================================================================

/// Cache manager configuration, surfaced by the cache config endpoint
#[derive(Debug, Clone, Serialize)]
pub struct CacheConfig {
    pub memory_enabled: bool,
    pub memory_max_entries: usize,
    pub memory_ttl_seconds: u64,
    pub shared_enabled: bool,
    pub active_case_ttl_seconds: u64,
    pub closed_case_ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            memory_enabled: true,
            memory_max_entries: DEFAULT_MAX_ENTRIES,
            memory_ttl_seconds: DEFAULT_MEMORY_TTL.as_secs(),
            shared_enabled: false,
            active_case_ttl_seconds: ACTIVE_CASE_TTL.as_secs(),
            closed_case_ttl_seconds: CLOSED_CASE_TTL.as_secs(),
        }
    }
}

#[derive(Default)]
struct TierCounters {
    memory_hits: AtomicU64,
    memory_misses: AtomicU64,
    shared_hits: AtomicU64,
    shared_misses: AtomicU64,
    total_sets: AtomicU64,
    total_deletes: AtomicU64,
}

/// Point-in-time statistics across tiers
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatsSnapshot {
    pub memory_hits: u64,
    pub memory_misses: u64,
    pub shared_hits: u64,
    pub shared_misses: u64,
    pub total_sets: u64,
    pub total_deletes: u64,
    pub memory_hit_rate: f64,
    pub shared_hit_rate: f64,
    pub overall_hit_rate: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_cache: Option<MemoryCacheStats>,
}

fn rate(hits: u64, misses: u64) -> f64 {
    let total = hits + misses;
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}

// =============================================================================
// Cache manager
// =============================================================================

/// Multi-tier cache for built contexts
pub struct CacheManager {
    memory: Option<MemoryCache>,
    shared: Option<Arc<dyn SharedCacheBackend>>,
    config: CacheConfig,
    counters: TierCounters,
}

impl CacheManager {
    /// Tier 1 only, with default sizing
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default(), None)
    }

    pub fn with_config(
        mut config: CacheConfig,
        shared: Option<Arc<dyn SharedCacheBackend>>,
    ) -> Self {
        config.shared_enabled = shared.is_some();
        let memory = config.memory_enabled.then(|| {
            MemoryCache::new(
                config.memory_max_entries,
                Duration::from_secs(config.memory_ttl_seconds),
            )
        });
        info!(
            memory = config.memory_enabled,
            shared = config.shared_enabled,
            "cache manager initialized"
        );
        CacheManager {
            memory,
            shared,
            config,
            counters: TierCounters::default(),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Look up a cached context, checking Tier 1 then the shared tier.
    /// A shared-tier hit repopulates Tier 1.
    pub async fn get(
        &self,
        client_id: &str,
        case_id: &str,
        scope: Scope,
        dimension: Option<Dimension>,
    ) -> Option<serde_json::Value> {
        let key = CacheKey::new(client_id, case_id, scope, dimension);

        if let Some(memory) = &self.memory {
            if let Some(value) = memory.get(&key) {
                self.counters.memory_hits.fetch_add(1, Ordering::Relaxed);
                metrics::record_cache_hit("memory");
                debug!(key = %key, "memory cache hit");
                return Some(value);
            }
            self.counters.memory_misses.fetch_add(1, Ordering::Relaxed);
            metrics::record_cache_miss("memory");
        }

        if let Some(shared) = &self.shared {
            match shared.get(&key).await {
                Ok(Some(value)) => {
                    self.counters.shared_hits.fetch_add(1, Ordering::Relaxed);
                    metrics::record_cache_hit("shared");
                    debug!(key = %key, backend = shared.name(), "shared cache hit");
                    if let Some(memory) = &self.memory {
                        memory.set(key, value.clone(), None, CaseStatus::Active);
                    }
                    return Some(value);
                }
                Ok(None) => {
                    self.counters.shared_misses.fetch_add(1, Ordering::Relaxed);
                    metrics::record_cache_miss("shared");
                }
                Err(err) => {
                    // A flaky shared tier must not fail lookups
                    debug!(key = %key, error = %err, "shared cache lookup failed");
                    self.counters.shared_misses.fetch_add(1, Ordering::Relaxed);
                    metrics::record_cache_miss("shared");
                }
            }
        }

        debug!(key = %key, "cache miss in all tiers");
        None
    }

    /// Store a context in every enabled tier
    pub async fn set(
        &self,
        client_id: &str,
        case_id: &str,
        scope: Scope,
        value: serde_json::Value,
        case_status: CaseStatus,
        dimension: Option<Dimension>,
    ) {
        let key = CacheKey::new(client_id, case_id, scope, dimension);
        let shared_ttl = match case_status {
            CaseStatus::Active => ACTIVE_CASE_TTL,
            CaseStatus::Closed => CLOSED_CASE_TTL,
        };

        if let Some(memory) = &self.memory {
            memory.set(key.clone(), value.clone(), None, case_status);
        }

        if let Some(shared) = &self.shared {
            if let Err(err) = shared.set(&key, value, shared_ttl).await {
                debug!(key = %key, error = %err, "shared cache set failed");
            }
        }

        self.counters.total_sets.fetch_add(1, Ordering::Relaxed);
        debug!(
            key = %key,
            status = %case_status,
            shared_ttl_secs = shared_ttl.as_secs(),
            "cache set"
        );
    }

    /// Delete cached contexts. With no scope, all scopes for the case are
    /// dropped. Returns the number of logical entries removed; a key held
    /// by both tiers counts once.
    pub async fn delete(
        &self,
        client_id: &str,
        case_id: &str,
        scope: Option<Scope>,
        dimension: Option<Dimension>,
    ) -> usize {
        let scopes: Vec<Scope> = match scope {
            Some(s) => vec![s],
            None => Scope::ALL.to_vec(),
        };

        let mut deleted = 0;
        for s in scopes {
            let key = CacheKey::new(client_id, case_id, s, dimension);
            let mut removed = false;
            if let Some(memory) = &self.memory {
                removed |= memory.delete(&key);
            }
            if let Some(shared) = &self.shared {
                removed |= matches!(shared.delete(&key).await, Ok(true));
            }
            if removed {
                deleted += 1;
            }
        }

        self.counters
            .total_deletes
            .fetch_add(deleted as u64, Ordering::Relaxed);
        info!(
            case_id,
            scope = %scope.map(|s| s.to_string()).unwrap_or_else(|| "all".to_string()),
            deleted,
            "cache invalidated"
        );
        deleted
    }

    /// Drop every cached context for a case, across all scopes
    pub async fn invalidate_case(&self, client_id: &str, case_id: &str) -> usize {
        self.delete(client_id, case_id, None, None).await
    }

    pub fn stats(&self) -> CacheStatsSnapshot {
        let memory_hits = self.counters.memory_hits.load(Ordering::Relaxed);
        let memory_misses = self.counters.memory_misses.load(Ordering::Relaxed);
        let shared_hits = self.counters.shared_hits.load(Ordering::Relaxed);
        let shared_misses = self.counters.shared_misses.load(Ordering::Relaxed);

        CacheStatsSnapshot {
            memory_hits,
            memory_misses,
            shared_hits,
            shared_misses,
            total_sets: self.counters.total_sets.load(Ordering::Relaxed),
            total_deletes: self.counters.total_deletes.load(Ordering::Relaxed),
            memory_hit_rate: rate(memory_hits, memory_misses),
            shared_hit_rate: rate(shared_hits, shared_misses),
            overall_hit_rate: rate(
                memory_hits + shared_hits,
                memory_misses + shared_misses,
            ),
            memory_cache: self.memory.as_ref().map(|m| m.stats()),
        }
    }

    pub fn reset_stats(&self) {
        self.counters.memory_hits.store(0, Ordering::Relaxed);
        self.counters.memory_misses.store(0, Ordering::Relaxed);
        self.counters.shared_hits.store(0, Ordering::Relaxed);
        self.counters.shared_misses.store(0, Ordering::Relaxed);
        self.counters.total_sets.store(0, Ordering::Relaxed);
        self.counters.total_deletes.store(0, Ordering::Relaxed);
        info!("cache statistics reset");
    }

    /// Tier health, used by the cache health endpoint
    pub fn memory_enabled(&self) -> bool {
        self.memory.is_some()
    }

    pub fn shared_enabled(&self) -> bool {
        self.shared.is_some()
    }
}

impl Default for CacheManager {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_miss_then_hit() {
        let cache = CacheManager::new();
        assert!(cache
            .get("client", "case-1", Scope::Standard, None)
            .await
            .is_none());

        cache
            .set(
                "client",
                "case-1",
                Scope::Standard,
                json!({"context_score": 0.9}),
                CaseStatus::Active,
                None,
            )
            .await;

        let hit = cache.get("client", "case-1", Scope::Standard, None).await;
        assert_eq!(hit, Some(json!({"context_score": 0.9})));

        let stats = cache.stats();
        assert_eq!(stats.memory_hits, 1);
        assert_eq!(stats.memory_misses, 1);
        assert_eq!(stats.total_sets, 1);
        assert!((stats.memory_hit_rate - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_scope_isolation() {
        let cache = CacheManager::new();
        cache
            .set(
                "client",
                "case-1",
                Scope::Minimal,
                json!(1),
                CaseStatus::Active,
                None,
            )
            .await;
        assert!(cache
            .get("client", "case-1", Scope::Comprehensive, None)
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_shared_tier_fallthrough_repopulates_memory() {
        let shared = Arc::new(InMemorySharedBackend::new());
        let cache = CacheManager::with_config(CacheConfig::default(), Some(shared.clone()));

        // Seed only the shared tier
        let key = CacheKey::new("client", "case-1", Scope::Standard, None);
        shared
            .set(&key, json!({"from": "shared"}), Duration::from_secs(60))
            .await
            .unwrap();

        let value = cache.get("client", "case-1", Scope::Standard, None).await;
        assert_eq!(value, Some(json!({"from": "shared"})));

        let stats = cache.stats();
        assert_eq!(stats.shared_hits, 1);
        assert_eq!(stats.memory_misses, 1);

        // Second lookup is now served from Tier 1
        cache.get("client", "case-1", Scope::Standard, None).await;
        assert_eq!(cache.stats().memory_hits, 1);
    }

    #[tokio::test]
    async fn test_delete_all_scopes() {
        let cache = CacheManager::new();
        for scope in Scope::ALL {
            cache
                .set("client", "case-1", scope, json!(1), CaseStatus::Active, None)
                .await;
        }

        let deleted = cache.invalidate_case("client", "case-1").await;
        assert_eq!(deleted, 3);
        for scope in Scope::ALL {
            assert!(cache.get("client", "case-1", scope, None).await.is_none());
        }
    }

    #[tokio::test]
    async fn test_delete_specific_scope_only() {
        let cache = CacheManager::new();
        cache
            .set("client", "case-1", Scope::Minimal, json!(1), CaseStatus::Active, None)
            .await;
        cache
            .set("client", "case-1", Scope::Standard, json!(2), CaseStatus::Active, None)
            .await;

        let deleted = cache
            .delete("client", "case-1", Some(Scope::Minimal), None)
            .await;
        assert_eq!(deleted, 1);
        assert!(cache
            .get("client", "case-1", Scope::Standard, None)
            .await
            .is_some());
    }

    #[tokio::test]
    async fn test_delete_counts_keys_once_across_tiers() {
        let shared = Arc::new(InMemorySharedBackend::new());
        let cache = CacheManager::with_config(CacheConfig::default(), Some(shared.clone()));

        // Set populates both tiers with the same key
        cache
            .set("client", "case-1", Scope::Minimal, json!(1), CaseStatus::Active, None)
            .await;

        let deleted = cache
            .delete("client", "case-1", Some(Scope::Minimal), None)
            .await;
        assert_eq!(deleted, 1);
        assert_eq!(cache.stats().total_deletes, 1);

        // Both tiers are actually empty afterwards
        let key = CacheKey::new("client", "case-1", Scope::Minimal, None);
        assert_eq!(shared.get(&key).await.unwrap(), None);
        assert!(cache
            .get("client", "case-1", Scope::Minimal, None)
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_invalidate_case_counts_keys_once_across_tiers() {
        let shared = Arc::new(InMemorySharedBackend::new());
        let cache = CacheManager::with_config(CacheConfig::default(), Some(shared));
        for scope in Scope::ALL {
            cache
                .set("client", "case-1", scope, json!(1), CaseStatus::Active, None)
                .await;
        }

        let deleted = cache.invalidate_case("client", "case-1").await;
        assert_eq!(deleted, 3);
    }

    #[tokio::test]
    async fn test_reset_stats() {
        let cache = CacheManager::new();
        cache.get("client", "case-1", Scope::Standard, None).await;
        assert_eq!(cache.stats().memory_misses, 1);
        cache.reset_stats();
        let stats = cache.stats();
        assert_eq!(stats.memory_misses, 0);
        assert_eq!(stats.overall_hit_rate, 0.0);
    }

    #[tokio::test]
    async fn test_in_memory_shared_backend_expiry() {
        let backend = InMemorySharedBackend::new();
        let key = CacheKey::new("c", "k", Scope::Standard, None);
        backend
            .set(&key, json!(1), Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(backend.get(&key).await.unwrap(), None);
    }
}
