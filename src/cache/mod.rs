//! Case-aware context cache
//!
//! Two tiers: a per-process LRU (Tier 1) and an optional shared backend
//! (Tier 2). Keys embed client and case identifiers for tenant isolation.

pub mod entry;
pub mod manager;
pub mod memory;

pub use entry::{CacheEntry, CacheKey, CaseStatus};
pub use manager::{
    CacheConfig, CacheManager, CacheStatsSnapshot, InMemorySharedBackend, SharedCacheBackend,
    ACTIVE_CASE_TTL, CLOSED_CASE_TTL,
};
pub use memory::{MemoryCache, MemoryCacheStats, DEFAULT_MAX_ENTRIES, DEFAULT_MEMORY_TTL};
