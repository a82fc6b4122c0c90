//! GraphRAG knowledge-graph client
//!
//! Two query modes:
//! - case context (LOCAL search, case_id required and enforced)
//! - legal research (GLOBAL search, cross-case, no case_id)
//!
//! Connect and timeout failures are retried with exponential backoff.
//! HTTP status errors are never retried.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

use crate::error::{Error, Result};

// =============================================================================
// Response models
// =============================================================================

/// Entity node in the knowledge graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEntity {
    pub entity_id: String,
    pub entity_text: String,
    /// Uppercase type, e.g. CASE_CITATION, COURT, PARTY
    pub entity_type: String,
    pub confidence_score: f64,
    #[serde(default)]
    pub document_ids: Vec<String>,
    #[serde(default)]
    pub case_id: Option<String>,
    #[serde(default)]
    pub properties: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

/// Relationship edge in the knowledge graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphRelationship {
    pub relationship_id: String,
    pub source_entity_id: String,
    pub target_entity_id: String,
    pub relationship_type: String,
    pub confidence: f64,
    #[serde(default)]
    pub case_id: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

/// Community cluster in the knowledge graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphCommunity {
    pub community_id: String,
    pub title: String,
    pub summary: String,
    pub size: u64,
    pub level: u32,
    #[serde(default)]
    pub entities: Vec<String>,
    pub coherence_score: f64,
    #[serde(default)]
    pub key_relationships: Vec<String>,
    #[serde(default)]
    pub client_id: Option<String>,
}

/// Result of a graph query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphQueryResponse {
    pub query: String,
    pub search_type: String,
    #[serde(default)]
    pub mode: String,
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub entities: Vec<GraphEntity>,
    #[serde(default)]
    pub relationships: Vec<GraphRelationship>,
    #[serde(default)]
    pub communities: Option<Vec<GraphCommunity>>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub execution_time_ms: u64,
}

/// Graph database statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphStats {
    pub total_entities: u64,
    pub total_relationships: u64,
    pub total_communities: u64,
    pub total_documents: u64,
    #[serde(default)]
    pub entity_breakdown: HashMap<String, u64>,
    #[serde(default)]
    pub relationship_breakdown: HashMap<String, u64>,
    #[serde(default)]
    pub graph_metrics: HashMap<String, f64>,
    #[serde(default)]
    pub quality_metrics: HashMap<String, f64>,
}

/// Search strategy for graph queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SearchType {
    /// Case-scoped retrieval
    Local,
    /// Cross-case retrieval
    Global,
    /// Blend of both
    Hybrid,
}

#[derive(Debug, Serialize)]
struct GraphQueryRequest<'a> {
    query: &'a str,
    client_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    case_id: Option<&'a str>,
    search_type: SearchType,
    mode: &'a str,
    community_level: u32,
    vector_weight: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    filters: Option<HashMap<&'a str, &'a str>>,
}

// =============================================================================
// Client
// =============================================================================

/// GraphRAG client configuration
#[derive(Debug, Clone)]
pub struct GraphRagConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for GraphRagConfig {
    fn default() -> Self {
        GraphRagConfig {
            base_url: "http://localhost:8010".to_string(),
            timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
        }
    }
}

/// HTTP client for the GraphRAG service
pub struct GraphRagClient {
    http: reqwest::Client,
    config: GraphRagConfig,
}

impl GraphRagClient {
    pub fn new(config: GraphRagConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(Error::GraphConnection)?;
        info!(
            base_url = %config.base_url,
            timeout_secs = config.timeout.as_secs(),
            max_retries = config.max_retries,
            "graphrag client initialized"
        );
        Ok(GraphRagClient { http, config })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn require_case_id<'a>(case_id: Option<&'a str>, operation: &str) -> Result<&'a str> {
        match case_id {
            Some(id) if !id.trim().is_empty() => Ok(id),
            _ => Err(Error::MissingCaseId {
                operation: operation.to_string(),
            }),
        }
    }

    /// Send a request, retrying connect/timeout failures with exponential
    /// backoff. Status errors surface immediately.
    async fn send_with_retry(&self, build: impl Fn() -> reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let mut attempt = 0u32;
        loop {
            match build().send().await {
                Ok(response) => {
                    let status = response.status();
                    if !status.is_success() {
                        let body = response.text().await.unwrap_or_default();
                        return Err(Error::GraphQuery(format!("HTTP {status}: {body}")));
                    }
                    return Ok(response);
                }
                Err(err) if (err.is_connect() || err.is_timeout()) && attempt < self.config.max_retries => {
                    let delay = self.config.retry_delay * 2u32.pow(attempt);
                    warn!(
                        attempt = attempt + 1,
                        max = self.config.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "graphrag request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(Error::GraphConnection(err)),
            }
        }
    }

    async fn parse<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let body = response
            .text()
            .await
            .map_err(|e| Error::GraphResponseParse(e.to_string()))?;
        serde_json::from_str(&body).map_err(|e| Error::GraphResponseParse(e.to_string()))
    }

    /// Case-scoped query (LOCAL search). The case_id is mandatory so
    /// results can never cross case boundaries.
    #[instrument(skip(self, query))]
    pub async fn query_case_graph(
        &self,
        client_id: &str,
        case_id: &str,
        query: &str,
        search_type: SearchType,
    ) -> Result<GraphQueryResponse> {
        Self::require_case_id(Some(case_id), "query_case_graph")?;

        let start = Instant::now();
        let url = format!("{}/api/v1/graphrag/query", self.config.base_url);
        let payload = GraphQueryRequest {
            query,
            client_id,
            case_id: Some(case_id),
            search_type,
            mode: "FULL",
            community_level: 2,
            vector_weight: 0.6,
            filters: None,
        };

        let response = self
            .send_with_retry(|| self.http.post(&url).json(&payload))
            .await?;
        let mut result: GraphQueryResponse = Self::parse(response).await?;
        result.execution_time_ms = start.elapsed().as_millis() as u64;

        let orphaned = result.entities.iter().filter(|e| e.case_id.is_none()).count();
        if orphaned > 0 {
            warn!(
                case_id,
                orphaned, "entities returned without case_id, possible isolation violation"
            );
        }

        debug!(
            case_id,
            entities = result.entities.len(),
            elapsed_ms = result.execution_time_ms,
            "case graph query complete"
        );
        Ok(result)
    }

    /// Cross-case research query (GLOBAL search), no case_id on purpose
    #[instrument(skip(self, query))]
    pub async fn query_legal_research(
        &self,
        client_id: &str,
        query: &str,
        jurisdiction: Option<&str>,
    ) -> Result<GraphQueryResponse> {
        let start = Instant::now();
        let url = format!("{}/api/v1/graphrag/query", self.config.base_url);
        let filters = jurisdiction.map(|j| HashMap::from([("jurisdiction", j)]));
        let payload = GraphQueryRequest {
            query,
            client_id,
            case_id: None,
            search_type: SearchType::Global,
            mode: "FULL",
            community_level: 2,
            vector_weight: 0.6,
            filters,
        };

        let response = self
            .send_with_retry(|| self.http.post(&url).json(&payload))
            .await?;
        let mut result: GraphQueryResponse = Self::parse(response).await?;
        result.execution_time_ms = start.elapsed().as_millis() as u64;

        info!(
            entities = result.entities.len(),
            elapsed_ms = result.execution_time_ms,
            "legal research query complete"
        );
        Ok(result)
    }

    /// List entities for a case, optionally filtered by type
    #[instrument(skip(self))]
    pub async fn get_case_entities(
        &self,
        client_id: &str,
        case_id: &str,
        entity_type: Option<&str>,
        min_confidence: f64,
        limit: u32,
    ) -> Result<Vec<GraphEntity>> {
        Self::require_case_id(Some(case_id), "get_case_entities")?;

        let url = format!(
            "{}/api/v1/graphrag/entities/{client_id}",
            self.config.base_url
        );
        let min_confidence = min_confidence.to_string();
        let limit = limit.to_string();
        let mut params = vec![
            ("case_id", case_id),
            ("min_confidence", min_confidence.as_str()),
            ("limit", limit.as_str()),
        ];
        if let Some(t) = entity_type {
            params.push(("entity_type", t));
        }

        let response = self
            .send_with_retry(|| self.http.get(&url).query(&params))
            .await?;

        #[derive(Deserialize)]
        struct EntitiesEnvelope {
            #[serde(default)]
            entities: Vec<GraphEntity>,
        }
        let envelope: EntitiesEnvelope = Self::parse(response).await?;
        debug!(case_id, count = envelope.entities.len(), "entities fetched");
        Ok(envelope.entities)
    }

    /// Search precedents across cases for a legal issue
    #[instrument(skip(self))]
    pub async fn search_precedents(
        &self,
        client_id: &str,
        legal_issue: &str,
        jurisdiction: Option<&str>,
        court_level: Option<&str>,
        max_results: usize,
    ) -> Result<Vec<GraphEntity>> {
        let mut query = format!("Find legal precedents related to: {legal_issue}");
        if let Some(j) = jurisdiction {
            query.push_str(&format!(" in {j} jurisdiction"));
        }
        if let Some(c) = court_level {
            query.push_str(&format!(" from {c} court"));
        }

        let response = self
            .query_legal_research(client_id, &query, jurisdiction)
            .await?;

        let precedents: Vec<GraphEntity> = response
            .entities
            .into_iter()
            .filter(|e| {
                matches!(
                    e.entity_type.as_str(),
                    "CASE_CITATION" | "CASE_LAW" | "LEGAL_DOCTRINE" | "HOLDING"
                )
            })
            .take(max_results)
            .collect();

        info!(count = precedents.len(), "precedent search complete");
        Ok(precedents)
    }

    /// Find cases similar to a reference case
    #[instrument(skip(self))]
    pub async fn find_similar_cases(
        &self,
        client_id: &str,
        reference_case_id: &str,
        max_results: usize,
    ) -> Result<Vec<GraphEntity>> {
        Self::require_case_id(Some(reference_case_id), "find_similar_cases")?;

        let query = format!(
            "Find cases similar to case {reference_case_id} based on legal issues and entities"
        );
        let response = self.query_legal_research(client_id, &query, None).await?;

        let similar: Vec<GraphEntity> = response
            .entities
            .into_iter()
            .filter(|e| {
                matches!(e.entity_type.as_str(), "CASE_CITATION" | "CASE_LAW")
                    && e.case_id.as_deref() != Some(reference_case_id)
            })
            .take(max_results)
            .collect();

        info!(
            reference_case_id,
            count = similar.len(),
            "similar case search complete"
        );
        Ok(similar)
    }

    /// Graph statistics, overall or narrowed to a client or case
    #[instrument(skip(self))]
    pub async fn get_graph_stats(
        &self,
        client_id: Option<&str>,
        case_id: Option<&str>,
    ) -> Result<GraphStats> {
        let url = format!("{}/api/v1/graph/stats", self.config.base_url);
        let mut params = vec![("include_details", "true")];
        if let Some(c) = case_id {
            params.push(("case_id", c));
        }
        if let Some(c) = client_id {
            params.push(("client_id", c));
        }

        let response = self
            .send_with_retry(|| self.http.get(&url).query(&params))
            .await?;

        // The stats endpoint nests counts under "statistics"
        #[derive(Deserialize)]
        struct StatsEnvelope {
            #[serde(default)]
            statistics: CountBlock,
            #[serde(default)]
            entity_breakdown: HashMap<String, u64>,
            #[serde(default)]
            relationship_breakdown: HashMap<String, u64>,
            #[serde(default)]
            graph_metrics: HashMap<String, f64>,
            #[serde(default)]
            quality_metrics: HashMap<String, f64>,
        }
        #[derive(Deserialize, Default)]
        struct CountBlock {
            #[serde(default)]
            total_entities: u64,
            #[serde(default)]
            total_relationships: u64,
            #[serde(default)]
            total_communities: u64,
            #[serde(default)]
            total_documents: u64,
        }

        let envelope: StatsEnvelope = Self::parse(response).await?;
        Ok(GraphStats {
            total_entities: envelope.statistics.total_entities,
            total_relationships: envelope.statistics.total_relationships,
            total_communities: envelope.statistics.total_communities,
            total_documents: envelope.statistics.total_documents,
            entity_breakdown: envelope.entity_breakdown,
            relationship_breakdown: envelope.relationship_breakdown,
            graph_metrics: envelope.graph_metrics,
            quality_metrics: envelope.quality_metrics,
        })
    }

    /// Readiness probe against the GraphRAG service
    pub async fn health_check(&self) -> bool {
        let url = format!("{}/api/v1/health/ready", self.config.base_url);
        match self.http.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(err) => {
                debug!(error = %err, "graphrag health check failed");
                false
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_require_case_id() {
        assert_eq!(
            GraphRagClient::require_case_id(Some("case-1"), "op").unwrap(),
            "case-1"
        );
        assert_matches!(
            GraphRagClient::require_case_id(None, "op"),
            Err(Error::MissingCaseId { .. })
        );
        assert_matches!(
            GraphRagClient::require_case_id(Some("  "), "op"),
            Err(Error::MissingCaseId { .. })
        );
    }

    #[test]
    fn test_query_request_serialization() {
        let payload = GraphQueryRequest {
            query: "What statutes are cited?",
            client_id: "client-1",
            case_id: Some("case-1"),
            search_type: SearchType::Local,
            mode: "FULL",
            community_level: 2,
            vector_weight: 0.6,
            filters: None,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["search_type"], "LOCAL");
        assert_eq!(json["case_id"], "case-1");
        assert!(json.get("filters").is_none());
    }

    #[test]
    fn test_research_request_omits_case_id() {
        let payload = GraphQueryRequest {
            query: "precedents",
            client_id: "client-1",
            case_id: None,
            search_type: SearchType::Global,
            mode: "FULL",
            community_level: 2,
            vector_weight: 0.6,
            filters: Some(HashMap::from([("jurisdiction", "federal")])),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("case_id").is_none());
        assert_eq!(json["filters"]["jurisdiction"], "federal");
        assert_eq!(json["search_type"], "GLOBAL");
    }

    #[test]
    fn test_query_response_parses_minimal_body() {
        let body = r#"{
            "query": "q",
            "search_type": "LOCAL",
            "mode": "FULL",
            "response": "answer",
            "entities": [{
                "entity_id": "e1",
                "entity_text": "Smith v. Jones",
                "entity_type": "CASE_CITATION",
                "confidence_score": 0.92,
                "case_id": "case-1"
            }]
        }"#;
        let parsed: GraphQueryResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.entities.len(), 1);
        assert_eq!(parsed.entities[0].entity_type, "CASE_CITATION");
        assert!(parsed.communities.is_none());
        assert_eq!(parsed.execution_time_ms, 0);
    }

    #[test]
    fn test_default_config() {
        let config = GraphRagConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_delay, Duration::from_secs(1));
        assert_eq!(config.timeout, Duration::from_secs(30));
    }
}
