//! Cache administration handlers

use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use tracing::{info, warn};

use super::server::AppState;
use crate::error::{Error, Result};
use crate::model::Scope;

fn default_standard() -> Scope {
    Scope::Standard
}

/// Body for POST /api/v1/cache/warmup
#[derive(Debug, Deserialize)]
pub struct CacheWarmupRequest {
    pub client_id: String,
    pub case_ids: Vec<String>,
    #[serde(default = "default_standard")]
    pub scope: Scope,
}

fn required<'a>(params: &'a HashMap<String, String>, key: &str) -> Result<&'a str> {
    params
        .get(key)
        .map(|s| s.as_str())
        .ok_or_else(|| Error::BadRequest(format!("missing required parameter: {key}")))
}

/// GET /api/v1/cache/stats
pub async fn stats(state: &AppState) -> Result<serde_json::Value> {
    Ok(serde_json::to_value(state.builder.cache().stats())?)
}

/// POST /api/v1/cache/stats/reset
pub async fn reset_stats(state: &AppState) -> Result<serde_json::Value> {
    state.builder.cache().reset_stats();
    Ok(json!({ "message": "Cache statistics reset" }))
}

/// DELETE /api/v1/cache/invalidate
///
/// Without a scope parameter, entries for every scope are dropped.
pub async fn invalidate(
    state: &AppState,
    params: &HashMap<String, String>,
) -> Result<serde_json::Value> {
    let client_id = required(params, "client_id")?;
    let case_id = required(params, "case_id")?;
    let scope = match params.get("scope") {
        Some(raw) => Some(raw.parse::<Scope>()?),
        None => None,
    };

    let removed = state
        .builder
        .cache()
        .delete(client_id, case_id, scope, None)
        .await;
    info!(case_id, removed, "cache entries invalidated");
    Ok(json!({
        "message": "Cache invalidated",
        "case_id": case_id,
        "entries_removed": removed,
    }))
}

/// POST /api/v1/cache/invalidate/case, drops every scope for the case
pub async fn invalidate_case(
    state: &AppState,
    params: &HashMap<String, String>,
) -> Result<serde_json::Value> {
    let client_id = required(params, "client_id")?;
    let case_id = required(params, "case_id")?;

    let removed = state.builder.cache().invalidate_case(client_id, case_id).await;
    info!(case_id, removed, "case cache invalidated");
    Ok(json!({
        "message": "Case cache invalidated",
        "case_id": case_id,
        "entries_removed": removed,
    }))
}

/// POST /api/v1/cache/warmup
///
/// Builds contexts for the listed cases so later requests hit the cache.
/// Failures are counted, never fatal.
pub async fn warmup(state: &AppState, request: CacheWarmupRequest) -> Result<serde_json::Value> {
    info!(
        cases = request.case_ids.len(),
        scope = %request.scope,
        "cache warmup"
    );

    let mut warmed = 0usize;
    let mut failed = 0usize;
    for case_id in &request.case_ids {
        match state
            .builder
            .build_context(&request.client_id, case_id, request.scope, None, true)
            .await
        {
            Ok(_) => warmed += 1,
            Err(err) => {
                warn!(case_id, error = %err, "warmup case failed");
                failed += 1;
            }
        }
    }

    Ok(json!({
        "message": "Cache warmup complete",
        "total_cases": request.case_ids.len(),
        "warmed": warmed,
        "failed": failed,
    }))
}

/// GET /api/v1/cache/config
pub async fn config(state: &AppState) -> Result<serde_json::Value> {
    Ok(serde_json::to_value(state.builder.cache().config())?)
}

/// GET /api/v1/cache/health
pub async fn health(state: &AppState) -> Result<serde_json::Value> {
    let cache = state.builder.cache();
    let memory = cache.memory_enabled();
    let shared = cache.shared_enabled();
    Ok(json!({
        "status": if memory || shared { "healthy" } else { "disabled" },
        "memory_tier": memory,
        "shared_tier": shared,
    }))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::{DimensionAnalyzer, DimensionContext};
    use crate::builder::ContextBuilder;
    use crate::cache::CacheManager;
    use crate::clients::{
        CaseStoreClient, CaseStoreConfig, GraphRagClient, GraphRagConfig,
    };
    use crate::health::HealthWatcher;
    use crate::model::{Dimension, WhereContext};
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::time::Duration;

    struct CannedForum;

    #[async_trait]
    impl DimensionAnalyzer for CannedForum {
        fn dimension(&self) -> Dimension {
            Dimension::Where
        }

        async fn analyze(&self, _client_id: &str, case_id: &str) -> Result<DimensionContext> {
            let mut ctx = WhereContext::empty(case_id, "Smith v. Jones");
            ctx.primary_jurisdiction = "Federal".into();
            ctx.court = "N.D. Cal.".into();
            ctx.venue = "San Francisco".into();
            Ok(DimensionContext::Where(ctx))
        }
    }

    fn test_state() -> AppState {
        let builder = ContextBuilder::with_analyzers(
            vec![Arc::new(CannedForum)],
            Arc::new(CacheManager::new()),
        );
        let graphrag = Arc::new(GraphRagClient::new(GraphRagConfig::default()).unwrap());
        let store = Arc::new(CaseStoreClient::new(CaseStoreConfig::default()).unwrap());
        AppState {
            builder: Arc::new(builder),
            health: HealthWatcher::new(graphrag, store, Duration::from_secs(30)),
        }
    }

    #[tokio::test]
    async fn test_warmup_counts_failures_without_aborting() {
        let state = test_state();
        let request = CacheWarmupRequest {
            client_id: "client".to_string(),
            case_ids: vec![
                "case-1".to_string(),
                String::new(),
                "case-2".to_string(),
            ],
            scope: Scope::Standard,
        };

        let value = warmup(&state, request).await.unwrap();
        assert_eq!(value["total_cases"], 3);
        assert_eq!(value["warmed"], 2);
        assert_eq!(value["failed"], 1);
    }

    #[test]
    fn test_warmup_request_defaults() {
        let request: CacheWarmupRequest = serde_json::from_str(
            r#"{"client_id": "c", "case_ids": ["a"]}"#,
        )
        .unwrap();
        assert_eq!(request.scope, Scope::Standard);
    }

    #[test]
    fn test_missing_param_is_bad_request() {
        let params = HashMap::new();
        assert!(required(&params, "client_id").unwrap_err().is_bad_request());
    }
}
