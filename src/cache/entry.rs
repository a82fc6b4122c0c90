//! Cache keys and entries
//!
//! Keys embed the client and case identifiers so cached context can never
//! leak across tenants or cases. The trailing hash keeps keys uniform when
//! identifiers carry unusual characters.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

use crate::model::{Dimension, Scope};

/// Case lifecycle status, drives shared-tier TTL selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CaseStatus {
    #[default]
    Active,
    Closed,
}

impl CaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaseStatus::Active => "active",
            CaseStatus::Closed => "closed",
        }
    }

    /// Lenient parse: anything that is not "closed" counts as active
    pub fn parse_lenient(s: &str) -> Self {
        if s.eq_ignore_ascii_case("closed") {
            CaseStatus::Closed
        } else {
            CaseStatus::Active
        }
    }
}

impl fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fast non-cryptographic hash (FxHash algorithm)
#[inline]
fn fx_hash(bytes: &[u8]) -> u64 {
    const SEED: u64 = 0x517cc1b727220a95;
    let mut hash = SEED;
    for &byte in bytes {
        hash = hash.rotate_left(5) ^ (byte as u64);
        hash = hash.wrapping_mul(SEED);
    }
    hash
}

/// Composite cache key with tenant and case isolation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    rendered: String,
}

impl CacheKey {
    /// Build a key of the form
    /// `context:{client_id}:{case_id}:{scope}[:{dimension}]:{hash8}`.
    pub fn new(
        client_id: &str,
        case_id: &str,
        scope: Scope,
        dimension: Option<Dimension>,
    ) -> Self {
        let mut parts = format!("{client_id}:{case_id}:{scope}");
        if let Some(dim) = dimension {
            parts.push(':');
            parts.push_str(dim.as_str());
        }
        let hash8 = format!("{:016x}", fx_hash(parts.as_bytes()));
        let rendered = format!("context:{parts}:{}", &hash8[..8]);
        CacheKey { rendered }
    }

    pub fn as_str(&self) -> &str {
        &self.rendered
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rendered)
    }
}

/// A cached context payload with expiry and hit tracking
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: serde_json::Value,
    pub created_at: Instant,
    pub expires_at: Instant,
    pub hit_count: u64,
    pub last_accessed: Option<Instant>,
    pub case_status: CaseStatus,
}

impl CacheEntry {
    pub fn new(value: serde_json::Value, ttl: Duration, case_status: CaseStatus) -> Self {
        let now = Instant::now();
        CacheEntry {
            value,
            created_at: now,
            expires_at: now + ttl,
            hit_count: 0,
            last_accessed: None,
            case_status,
        }
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    pub fn record_hit(&mut self) {
        self.hit_count += 1;
        self.last_accessed = Some(Instant::now());
    }
}

// =============================================================================
// Tests
// =============================================================================
