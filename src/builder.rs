//! Context builder
//!
//! Orchestrates the five dimension analyzers for a request: resolves the
//! scope, runs analyzers in parallel, scores the result, and keeps the
//! cache warm with complete contexts.

use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};

use crate::analyzer::{
    DimensionAnalyzer, DimensionContext, ForumAnalyzer, IssuesAnalyzer, PartiesAnalyzer,
    ReasoningAnalyzer, TimelineAnalyzer, COMPLETENESS_THRESHOLD,
};
use crate::cache::{CacheManager, CaseStatus};
use crate::clients::{CaseStoreClient, GraphRagClient};
use crate::error::{Error, Result};
use crate::model::{resolve_dimensions, ContextResponse, Dimension, DimensionQualityMetrics, Scope};

/// Overall score: mean of per-dimension scores, discounted by the share of
/// dimensions that actually built, clamped to [0, 1]
fn overall_score(dimension_scores: &[f64], successful: usize, requested: usize) -> f64 {
    if requested == 0 || dimension_scores.is_empty() {
        return 0.0;
    }
    let avg = dimension_scores.iter().sum::<f64>() / dimension_scores.len() as f64;
    let completeness_ratio = successful as f64 / requested as f64;
    (avg * completeness_ratio).clamp(0.0, 1.0)
}

/// Builds multi-dimensional case context
pub struct ContextBuilder {
    analyzers: HashMap<Dimension, Arc<dyn DimensionAnalyzer>>,
    cache: Arc<CacheManager>,
    store: Option<Arc<CaseStoreClient>>,
}

impl ContextBuilder {
    pub fn new(
        graphrag: Arc<GraphRagClient>,
        store: Arc<CaseStoreClient>,
        cache: Arc<CacheManager>,
    ) -> Self {
        let mut analyzers: HashMap<Dimension, Arc<dyn DimensionAnalyzer>> = HashMap::new();
        analyzers.insert(
            Dimension::Who,
            Arc::new(PartiesAnalyzer::new(graphrag.clone(), store.clone())),
        );
        analyzers.insert(Dimension::What, Arc::new(IssuesAnalyzer::new(store.clone())));
        analyzers.insert(Dimension::Where, Arc::new(ForumAnalyzer::new(store.clone())));
        analyzers.insert(
            Dimension::When,
            Arc::new(TimelineAnalyzer::new(store.clone())),
        );
        analyzers.insert(
            Dimension::Why,
            Arc::new(ReasoningAnalyzer::new(graphrag, store.clone())),
        );
        ContextBuilder {
            analyzers,
            cache,
            store: Some(store),
        }
    }

    /// Wire in custom analyzers. Used by tests to substitute fakes.
    pub fn with_analyzers(
        analyzers: Vec<Arc<dyn DimensionAnalyzer>>,
        cache: Arc<CacheManager>,
    ) -> Self {
        let analyzers = analyzers
            .into_iter()
            .map(|a| (a.dimension(), a))
            .collect();
        ContextBuilder {
            analyzers,
            cache,
            store: None,
        }
    }

    pub fn cache(&self) -> &Arc<CacheManager> {
        &self.cache
    }

    /// Build context for one case. The main entry point.
    #[instrument(skip(self, include_dimensions))]
    pub async fn build_context(
        &self,
        client_id: &str,
        case_id: &str,
        scope: Scope,
        include_dimensions: Option<&[String]>,
        use_cache: bool,
    ) -> Result<ContextResponse> {
        if case_id.is_empty() {
            return Err(Error::MissingCaseId {
                operation: "build_context".to_string(),
            });
        }

        let start = Instant::now();
        info!(client_id, case_id, scope = %scope, "building context");

        // Cache keys carry the scope, not the dimension list. An explicit
        // selection must not read or write the scope entry.
        let explicit_selection = include_dimensions.is_some_and(|dims| !dims.is_empty());

        if use_cache && !explicit_selection {
            if let Some(cached) = self.check_cache(client_id, case_id, scope).await {
                info!(case_id, "returning cached context");
                return Ok(cached);
            }
        }

        let dimensions = resolve_dimensions(scope, include_dimensions)?;
        let requested = dimensions.len();

        let results = self.build_dimensions(client_id, case_id, &dimensions).await;

        let successful = results.values().filter(|r| r.is_some()).count();
        let dimension_scores: Vec<f64> = dimensions
            .iter()
            .map(|dim| {
                results
                    .get(dim)
                    .and_then(|r| r.as_ref())
                    .map(|ctx| ctx.score())
                    .unwrap_or(0.0)
            })
            .collect();
        let context_score = overall_score(&dimension_scores, successful, requested);
        let is_complete = context_score >= COMPLETENESS_THRESHOLD;

        let case_name = self.pick_case_name(&results, case_id);
        let mut response = ContextResponse::new(case_id, case_name);
        response.context_score = context_score;
        response.is_complete = is_complete;
        response.execution_time_ms = start.elapsed().as_millis() as u64;

        for (_, result) in results {
            match result {
                Some(DimensionContext::Who(c)) => response.who = Some(c),
                Some(DimensionContext::What(c)) => response.what = Some(c),
                Some(DimensionContext::Where(c)) => response.where_ = Some(c),
                Some(DimensionContext::When(c)) => response.when = Some(c),
                Some(DimensionContext::Why(c)) => response.why = Some(c),
                None => {}
            }
        }

        // Only complete contexts are worth serving again
        if is_complete && use_cache && !explicit_selection {
            self.cache_context(client_id, case_id, scope, &response).await;
        }

        info!(
            case_id,
            score = context_score,
            complete = is_complete,
            elapsed_ms = response.execution_time_ms,
            "context building complete"
        );
        Ok(response)
    }

    async fn build_dimensions(
        &self,
        client_id: &str,
        case_id: &str,
        dimensions: &[Dimension],
    ) -> HashMap<Dimension, Option<DimensionContext>> {
        let futures = dimensions.iter().filter_map(|dim| {
            let analyzer = self.analyzers.get(dim)?.clone();
            let client_id = client_id.to_string();
            let case_id = case_id.to_string();
            let dim = *dim;
            Some(async move {
                match analyzer.analyze(&client_id, &case_id).await {
                    Ok(context) => (dim, Some(context)),
                    Err(err) => {
                        warn!(case_id, dimension = %dim, error = %err, "dimension analysis failed");
                        (dim, None)
                    }
                }
            })
        });
        join_all(futures).await.into_iter().collect()
    }

    /// Case name from any built dimension, falling back to `Case {id}`
    fn pick_case_name(
        &self,
        results: &HashMap<Dimension, Option<DimensionContext>>,
        case_id: &str,
    ) -> String {
        let fallback = format!("Case {case_id}");
        results
            .values()
            .flatten()
            .map(|ctx| ctx.case_name())
            .find(|name| !name.is_empty() && *name != fallback)
            .map(|name| name.to_string())
            .unwrap_or(fallback)
    }

    async fn check_cache(
        &self,
        client_id: &str,
        case_id: &str,
        scope: Scope,
    ) -> Option<ContextResponse> {
        let value = self.cache.get(client_id, case_id, scope, None).await?;
        match serde_json::from_value::<ContextResponse>(value) {
            Ok(mut cached) => {
                cached.cached = true;
                Some(cached)
            }
            Err(err) => {
                warn!(case_id, error = %err, "cached context failed to deserialize");
                None
            }
        }
    }

    async fn cache_context(
        &self,
        client_id: &str,
        case_id: &str,
        scope: Scope,
        context: &ContextResponse,
    ) {
        let value = match serde_json::to_value(context) {
            Ok(value) => value,
            Err(err) => {
                warn!(case_id, error = %err, "context serialization for cache failed");
                return;
            }
        };
        let case_status = self.case_status(client_id, case_id).await;
        self.cache
            .set(client_id, case_id, scope, value, case_status, None)
            .await;
    }

    /// Case status from the store, defaulting to active when unknown
    async fn case_status(&self, client_id: &str, case_id: &str) -> CaseStatus {
        let Some(store) = &self.store else {
            return CaseStatus::Active;
        };
        match store.get_case(client_id, case_id).await {
            Ok(Some(row)) => row
                .status
                .as_deref()
                .map(CaseStatus::parse_lenient)
                .unwrap_or_default(),
            _ => CaseStatus::Active,
        }
    }

    /// Quality metrics for one dimension, always freshly analyzed
    #[instrument(skip(self))]
    pub async fn get_dimension_quality(
        &self,
        client_id: &str,
        case_id: &str,
        dimension: Dimension,
    ) -> Result<DimensionQualityMetrics> {
        let context = self.refresh_dimension(client_id, case_id, dimension).await?;
        Ok(context.quality_metrics())
    }

    /// Rebuild one dimension, bypassing the cache
    #[instrument(skip(self))]
    pub async fn refresh_dimension(
        &self,
        client_id: &str,
        case_id: &str,
        dimension: Dimension,
    ) -> Result<DimensionContext> {
        let analyzer = self
            .analyzers
            .get(&dimension)
            .ok_or_else(|| Error::InvalidDimension(dimension.to_string()))?;
        analyzer.analyze(client_id, case_id).await
    }
}

// =============================================================================
// Tests
// =============================================================================
