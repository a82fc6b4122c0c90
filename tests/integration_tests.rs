//! Context Engine Integration Tests
//!
//! End-to-end tests over the public API:
//! - Multi-dimensional context building with scope resolution
//! - Multi-tier caching with shared-tier fallback and invalidation
//! - Response wire format

use std::sync::Arc;

use async_trait::async_trait;
use context_engine::analyzer::{DimensionAnalyzer, DimensionContext};
use context_engine::builder::ContextBuilder;
use context_engine::cache::{CacheConfig, CacheManager, CaseStatus, InMemorySharedBackend};
use context_engine::error::Result;
use context_engine::model::{
    Deadline, Dimension, LegalTheory, Party, Scope, WhatContext, WhenContext, WhereContext,
    WhoContext, WhyContext,
};
use serde_json::json;

// =============================================================================
// Test fixtures
// =============================================================================

/// Analyzer producing a fully populated context for any dimension
struct CannedAnalyzer {
    dimension: Dimension,
}

#[async_trait]
impl DimensionAnalyzer for CannedAnalyzer {
    fn dimension(&self) -> Dimension {
        self.dimension
    }

    async fn analyze(&self, _client_id: &str, case_id: &str) -> Result<DimensionContext> {
        let case_name = "Smith v. Jones";
        Ok(match self.dimension {
            Dimension::Who => {
                let mut ctx = WhoContext::empty(case_id, case_name);
                for i in 0..10 {
                    ctx.parties
                        .push(Party::new(format!("Party {i}"), "plaintiff", "person", case_id)?);
                }
                DimensionContext::Who(ctx)
            }
            Dimension::What => {
                let mut ctx = WhatContext::empty(case_id, case_name);
                ctx.legal_issues = (0..10).map(|i| format!("Issue {i}")).collect();
                DimensionContext::What(ctx)
            }
            Dimension::Where => {
                let mut ctx = WhereContext::empty(case_id, case_name);
                ctx.primary_jurisdiction = "Federal".into();
                ctx.court = "N.D. Cal.".into();
                ctx.venue = "San Francisco".into();
                DimensionContext::Where(ctx)
            }
            Dimension::When => {
                let now = chrono::Utc::now();
                let mut ctx = WhenContext::empty(case_id, case_name);
                ctx.filing_date = Some(now - chrono::Duration::days(90));
                for i in 0..10 {
                    ctx.upcoming_deadlines.push(Deadline {
                        deadline_date: now + chrono::Duration::days(i + 10),
                        deadline_type: "motion".into(),
                        description: format!("Deadline {i}"),
                        case_id: case_id.to_string(),
                        is_met: false,
                        priority: "high".into(),
                    });
                }
                DimensionContext::When(ctx)
            }
            Dimension::Why => {
                let mut ctx = WhyContext::empty(case_id, case_name);
                for i in 0..10 {
                    ctx.legal_theories.push(LegalTheory::new(
                        format!("Theory {i}"),
                        "Negligence per se",
                        0.8,
                        case_id,
                    ));
                }
                DimensionContext::Why(ctx)
            }
        })
    }
}

fn full_builder(cache: Arc<CacheManager>) -> ContextBuilder {
    let analyzers: Vec<Arc<dyn DimensionAnalyzer>> = Dimension::ALL
        .iter()
        .map(|&dimension| Arc::new(CannedAnalyzer { dimension }) as Arc<dyn DimensionAnalyzer>)
        .collect();
    ContextBuilder::with_analyzers(analyzers, cache)
}

// =============================================================================
// Context building
// =============================================================================

#[tokio::test]
async fn test_comprehensive_scope_builds_all_five_dimensions() {
    let builder = full_builder(Arc::new(CacheManager::new()));
    let response = builder
        .build_context("client-1", "case-1", Scope::Comprehensive, None, false)
        .await
        .unwrap();

    assert!(response.who.is_some());
    assert!(response.what.is_some());
    assert!(response.where_.is_some());
    assert!(response.when.is_some());
    assert!(response.why.is_some());
    assert_eq!(response.case_name, "Smith v. Jones");
    assert_eq!(response.context_score, 1.0);
    assert!(response.is_complete);
}

#[tokio::test]
async fn test_scope_widening() {
    let builder = full_builder(Arc::new(CacheManager::new()));

    let minimal = builder
        .build_context("client-1", "case-1", Scope::Minimal, None, false)
        .await
        .unwrap();
    assert!(minimal.who.is_some());
    assert!(minimal.where_.is_some());
    assert!(minimal.what.is_none());
    assert!(minimal.when.is_none());
    assert!(minimal.why.is_none());

    let standard = builder
        .build_context("client-1", "case-1", Scope::Standard, None, false)
        .await
        .unwrap();
    assert!(standard.what.is_some());
    assert!(standard.when.is_some());
    assert!(standard.why.is_none());
}

#[tokio::test]
async fn test_explicit_dimension_selection() {
    let builder = full_builder(Arc::new(CacheManager::new()));
    let response = builder
        .build_context(
            "client-1",
            "case-1",
            Scope::Comprehensive,
            Some(&["WHY".to_string(), "WHEN".to_string()]),
            false,
        )
        .await
        .unwrap();

    assert!(response.who.is_none());
    assert!(response.why.is_some());
    assert!(response.when.is_some());
}

#[tokio::test]
async fn test_response_wire_format() {
    let builder = full_builder(Arc::new(CacheManager::new()));
    let response = builder
        .build_context("client-1", "case-1", Scope::Comprehensive, None, false)
        .await
        .unwrap();

    let value = serde_json::to_value(&response).unwrap();
    // The WHERE dimension serializes under its natural name
    assert!(value.get("where").is_some());
    assert!(value.get("where_").is_none());
    assert!(value["query_id"].as_str().is_some());
    assert_eq!(value["case_id"], "case-1");
    assert_eq!(value["cached"], false);
}

// =============================================================================
// Tiered caching
// =============================================================================

#[tokio::test]
async fn test_cache_replay_marks_response_cached() {
    let builder = full_builder(Arc::new(CacheManager::new()));

    let first = builder
        .build_context("client-1", "case-1", Scope::Standard, None, true)
        .await
        .unwrap();
    assert!(!first.cached);

    let second = builder
        .build_context("client-1", "case-1", Scope::Standard, None, true)
        .await
        .unwrap();
    assert!(second.cached);
    assert_eq!(second.query_id, first.query_id);

    let stats = builder.cache().stats();
    assert_eq!(stats.memory_hits, 1);
    assert_eq!(stats.total_sets, 1);
}

#[tokio::test]
async fn test_shared_tier_serves_after_memory_restart() {
    let shared = Arc::new(InMemorySharedBackend::new());

    // First process instance builds and caches in both tiers
    let cache = Arc::new(CacheManager::with_config(
        CacheConfig::default(),
        Some(shared.clone()),
    ));
    let builder = full_builder(cache);
    builder
        .build_context("client-1", "case-1", Scope::Standard, None, true)
        .await
        .unwrap();

    // A fresh instance with an empty memory tier still hits the shared tier
    let cache = Arc::new(CacheManager::with_config(
        CacheConfig::default(),
        Some(shared),
    ));
    let builder = full_builder(cache);
    let replayed = builder
        .build_context("client-1", "case-1", Scope::Standard, None, true)
        .await
        .unwrap();
    assert!(replayed.cached);

    let stats = builder.cache().stats();
    assert_eq!(stats.shared_hits, 1);
    assert_eq!(stats.memory_misses, 1);

    // The shared hit repopulated the memory tier
    builder
        .build_context("client-1", "case-1", Scope::Standard, None, true)
        .await
        .unwrap();
    assert_eq!(builder.cache().stats().memory_hits, 1);
}

#[tokio::test]
async fn test_scopes_are_cached_independently() {
    let cache = Arc::new(CacheManager::new());
    cache
        .set(
            "client-1",
            "case-1",
            Scope::Standard,
            json!({"scope": "standard"}),
            CaseStatus::Active,
            None,
        )
        .await;

    assert!(cache
        .get("client-1", "case-1", Scope::Standard, None)
        .await
        .is_some());
    assert!(cache
        .get("client-1", "case-1", Scope::Minimal, None)
        .await
        .is_none());
    assert!(cache
        .get("client-1", "case-1", Scope::Comprehensive, None)
        .await
        .is_none());
}

#[tokio::test]
async fn test_tenant_isolation_in_cache() {
    let cache = Arc::new(CacheManager::new());
    cache
        .set(
            "client-a",
            "case-1",
            Scope::Standard,
            json!({"tenant": "a"}),
            CaseStatus::Active,
            None,
        )
        .await;

    assert!(cache
        .get("client-b", "case-1", Scope::Standard, None)
        .await
        .is_none());
}

#[tokio::test]
async fn test_case_invalidation_drops_all_scopes() {
    let cache = Arc::new(CacheManager::new());
    for scope in Scope::ALL {
        cache
            .set(
                "client-1",
                "case-1",
                scope,
                json!({"scope": scope.as_str()}),
                CaseStatus::Active,
                None,
            )
            .await;
    }

    let removed = cache.invalidate_case("client-1", "case-1").await;
    assert_eq!(removed, 3);
    for scope in Scope::ALL {
        assert!(cache.get("client-1", "case-1", scope, None).await.is_none());
    }
}

#[tokio::test]
async fn test_scoped_invalidation_leaves_other_scopes() {
    let cache = Arc::new(CacheManager::new());
    for scope in Scope::ALL {
        cache
            .set(
                "client-1",
                "case-1",
                scope,
                json!({}),
                CaseStatus::Active,
                None,
            )
            .await;
    }

    let removed = cache
        .delete("client-1", "case-1", Some(Scope::Minimal), None)
        .await;
    assert_eq!(removed, 1);
    assert!(cache
        .get("client-1", "case-1", Scope::Minimal, None)
        .await
        .is_none());
    assert!(cache
        .get("client-1", "case-1", Scope::Standard, None)
        .await
        .is_some());
}

// =============================================================================
// Dimension quality
// =============================================================================

#[tokio::test]
async fn test_dimension_quality_over_full_pipeline() {
    let builder = full_builder(Arc::new(CacheManager::new()));

    for dimension in Dimension::ALL {
        let quality = builder
            .get_dimension_quality("client-1", "case-1", dimension)
            .await
            .unwrap();
        assert_eq!(quality.dimension_name, dimension.as_str());
        assert_eq!(quality.completeness_score, 1.0);
        assert!(quality.is_sufficient);
    }
}
