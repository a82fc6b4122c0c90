//! Context retrieval handlers

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use tracing::{info, warn};

use super::server::AppState;
use crate::error::{Error, Result};
use crate::model::{Dimension, Scope};

// =============================================================================
// Request models
// =============================================================================

fn default_true() -> bool {
    true
}

fn default_standard() -> Scope {
    Scope::Standard
}

/// Body for POST /api/v1/context/retrieve
#[derive(Debug, Deserialize)]
pub struct ContextRetrievalRequest {
    pub client_id: String,
    pub case_id: String,
    #[serde(default)]
    pub scope: Scope,
    #[serde(default)]
    pub include_dimensions: Option<Vec<String>>,
    #[serde(default = "default_true")]
    pub use_cache: bool,
}

/// Body for POST /api/v1/context/dimension/retrieve
#[derive(Debug, Deserialize)]
pub struct DimensionRequest {
    pub client_id: String,
    pub case_id: String,
    pub dimension: String,
}

/// Body for POST /api/v1/context/batch/retrieve
#[derive(Debug, Deserialize)]
pub struct BatchContextRequest {
    pub client_id: String,
    pub case_ids: Vec<String>,
    #[serde(default = "default_standard")]
    pub scope: Scope,
    #[serde(default = "default_true")]
    pub use_cache: bool,
}

#[derive(Debug, Serialize)]
struct BatchContextResponse {
    total_cases: usize,
    successful: usize,
    failed: usize,
    contexts: HashMap<String, serde_json::Value>,
    errors: HashMap<String, String>,
}

fn required<'a>(params: &'a HashMap<String, String>, key: &str) -> Result<&'a str> {
    params
        .get(key)
        .map(|s| s.as_str())
        .ok_or_else(|| Error::BadRequest(format!("missing required parameter: {key}")))
}

// =============================================================================
// Handlers
// =============================================================================

/// POST /api/v1/context/retrieve
pub async fn retrieve(state: &AppState, request: ContextRetrievalRequest) -> Result<serde_json::Value> {
    let response = state
        .builder
        .build_context(
            &request.client_id,
            &request.case_id,
            request.scope,
            request.include_dimensions.as_deref(),
            request.use_cache,
        )
        .await?;
    Ok(serde_json::to_value(response)?)
}

/// GET /api/v1/context/retrieve, same semantics with query parameters
pub async fn retrieve_get(
    state: &AppState,
    params: &HashMap<String, String>,
) -> Result<serde_json::Value> {
    let scope = match params.get("scope") {
        Some(raw) => raw.parse::<Scope>()?,
        None => Scope::default(),
    };
    let use_cache = params
        .get("use_cache")
        .map(|v| v != "false")
        .unwrap_or(true);
    let request = ContextRetrievalRequest {
        client_id: required(params, "client_id")?.to_string(),
        case_id: required(params, "case_id")?.to_string(),
        scope,
        include_dimensions: None,
        use_cache,
    };
    retrieve(state, request).await
}

/// POST /api/v1/context/dimension/retrieve, always bypasses the cache
pub async fn retrieve_dimension(
    state: &AppState,
    request: DimensionRequest,
) -> Result<serde_json::Value> {
    let dimension: Dimension = request.dimension.parse()?;
    info!(
        case_id = %request.case_id,
        dimension = %dimension,
        "single dimension retrieval"
    );
    let context = state
        .builder
        .refresh_dimension(&request.client_id, &request.case_id, dimension)
        .await?;
    Ok(json!({
        "case_id": request.case_id,
        "dimension": dimension.as_str(),
        "data": context.into_json(),
    }))
}

/// GET /api/v1/context/dimension/quality
pub async fn dimension_quality(
    state: &AppState,
    params: &HashMap<String, String>,
) -> Result<serde_json::Value> {
    let client_id = required(params, "client_id")?;
    let case_id = required(params, "case_id")?;
    let dimension: Dimension = required(params, "dimension")?.parse()?;

    let quality = state
        .builder
        .get_dimension_quality(client_id, case_id, dimension)
        .await?;
    Ok(serde_json::to_value(quality)?)
}

/// POST /api/v1/context/refresh, forces a rebuild that repopulates the cache
pub async fn refresh(
    state: &AppState,
    params: &HashMap<String, String>,
) -> Result<serde_json::Value> {
    let client_id = required(params, "client_id")?;
    let case_id = required(params, "case_id")?;
    let scope = match params.get("scope") {
        Some(raw) => raw.parse::<Scope>()?,
        None => Scope::default(),
    };

    info!(case_id, scope = %scope, "context refresh");

    // Drop the stale entry, then rebuild with caching enabled so a
    // complete result lands back in the cache
    state
        .builder
        .cache()
        .delete(client_id, case_id, Some(scope), None)
        .await;
    let context = state
        .builder
        .build_context(client_id, case_id, scope, None, true)
        .await?;

    Ok(json!({
        "message": "Context refreshed successfully",
        "case_id": case_id,
        "scope": scope.as_str(),
        "new_context_score": context.context_score,
        "execution_time_ms": context.execution_time_ms,
    }))
}

/// POST /api/v1/context/batch/retrieve
///
/// Cases are processed sequentially with per-case error isolation, so one
/// bad case never sinks the batch.
pub async fn batch_retrieve(
    state: &AppState,
    request: BatchContextRequest,
) -> Result<serde_json::Value> {
    info!(
        cases = request.case_ids.len(),
        scope = %request.scope,
        "batch context retrieval"
    );

    let mut result = BatchContextResponse {
        total_cases: request.case_ids.len(),
        successful: 0,
        failed: 0,
        contexts: HashMap::new(),
        errors: HashMap::new(),
    };

    for case_id in &request.case_ids {
        match state
            .builder
            .build_context(
                &request.client_id,
                case_id,
                request.scope,
                None,
                request.use_cache,
            )
            .await
        {
            Ok(context) => {
                result
                    .contexts
                    .insert(case_id.clone(), serde_json::to_value(context)?);
                result.successful += 1;
            }
            Err(err) => {
                warn!(case_id, error = %err, "batch case failed");
                result.errors.insert(case_id.clone(), err.to_string());
                result.failed += 1;
            }
        }
    }

    info!(
        successful = result.successful,
        total = result.total_cases,
        "batch retrieval complete"
    );
    Ok(serde_json::to_value(result)?)
}

// =============================================================================
// Tests
// =============================================================================
