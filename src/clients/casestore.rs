//! Case store client
//!
//! PostgREST-style client for the structured case store. Every query is
//! filtered by client_id and case_id so reads stay tenant and case scoped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::error::{Error, Result};

// =============================================================================
// Row models
// =============================================================================

/// A case row from the client_cases table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaseRow {
    pub id: String,
    #[serde(default)]
    pub case_name: Option<String>,
    /// active or closed; anything else is treated as active
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub jurisdiction: Option<String>,
    #[serde(default)]
    pub court: Option<String>,
    #[serde(default)]
    pub venue: Option<String>,
    #[serde(default)]
    pub judge_chambers: Option<String>,
    #[serde(default)]
    pub filing_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub incident_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub discovery_cutoff: Option<DateTime<Utc>>,
    #[serde(default)]
    pub motion_deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub trial_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub statute_of_limitations: Option<DateTime<Utc>>,
}

impl CaseRow {
    /// Case name with the standard fallback when the store has none
    pub fn display_name(&self, case_id: &str) -> String {
        match &self.case_name {
            Some(name) if !name.is_empty() => name.clone(),
            _ => format!("Case {case_id}"),
        }
    }
}

/// A graph node row (entity) from the graph schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    pub node_id: String,
    pub entity_type: String,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub case_id: Option<String>,
    #[serde(default)]
    pub properties: HashMap<String, serde_json::Value>,
}

impl GraphNode {
    /// String property with a fallback
    pub fn prop_str(&self, key: &str, fallback: &str) -> String {
        self.properties
            .get(key)
            .and_then(|v| v.as_str())
            .unwrap_or(fallback)
            .to_string()
    }

    pub fn prop_opt_str(&self, key: &str) -> Option<String> {
        self.properties
            .get(key)
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    }

    pub fn prop_f64(&self, key: &str, fallback: f64) -> f64 {
        self.properties
            .get(key)
            .and_then(|v| v.as_f64())
            .unwrap_or(fallback)
    }

    pub fn prop_str_list(&self, key: &str) -> Vec<String> {
        self.properties
            .get(key)
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(|s| s.to_string()))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// A graph edge row (relationship) from the graph schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source_node_id: String,
    pub target_node_id: String,
    #[serde(default)]
    pub relationship_type: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub case_id: Option<String>,
}

// =============================================================================
// Client
// =============================================================================

/// Case store client configuration
#[derive(Debug, Clone)]
pub struct CaseStoreConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for CaseStoreConfig {
    fn default() -> Self {
        CaseStoreConfig {
            base_url: "http://localhost:3000".to_string(),
            api_key: None,
            timeout: Duration::from_secs(10),
        }
    }
}

/// HTTP client for the structured case store
pub struct CaseStoreClient {
    http: reqwest::Client,
    config: CaseStoreConfig,
}

impl CaseStoreClient {
    pub fn new(config: CaseStoreConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(Error::StoreConnection)?;
        info!(base_url = %config.base_url, "case store client initialized");
        Ok(CaseStoreClient { http, config })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn request(&self, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self.http.get(format!("{}{path}", self.config.base_url));
        if let Some(key) = &self.config.api_key {
            builder = builder
                .header("apikey", key)
                .header("Authorization", format!("Bearer {key}"));
        }
        builder
    }

    async fn fetch_rows<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<Vec<T>> {
        let response = self
            .request(path)
            .query(params)
            .send()
            .await
            .map_err(Error::StoreConnection)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::StoreQuery(format!("HTTP {status}: {body}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::StoreResponseParse(e.to_string()))?;
        serde_json::from_str(&body).map_err(|e| Error::StoreResponseParse(e.to_string()))
    }

    /// Fetch a case row. Returns None when the case does not exist.
    #[instrument(skip(self))]
    pub async fn get_case(&self, client_id: &str, case_id: &str) -> Result<Option<CaseRow>> {
        let params = [
            ("client_id", format!("eq.{client_id}")),
            ("id", format!("eq.{case_id}")),
            ("limit", "1".to_string()),
        ];
        let rows: Vec<CaseRow> = self.fetch_rows("/client/client_cases", &params).await?;
        debug!(case_id, found = !rows.is_empty(), "case row fetched");
        Ok(rows.into_iter().next())
    }

    /// Fetch graph nodes for a case, filtered by entity type
    #[instrument(skip(self, entity_types))]
    pub async fn get_nodes(
        &self,
        client_id: &str,
        case_id: &str,
        entity_types: &[&str],
    ) -> Result<Vec<GraphNode>> {
        let mut params = vec![
            ("client_id", format!("eq.{client_id}")),
            ("case_id", format!("eq.{case_id}")),
        ];
        if !entity_types.is_empty() {
            params.push(("entity_type", format!("in.({})", entity_types.join(","))));
        }
        let nodes: Vec<GraphNode> = self.fetch_rows("/graph/nodes", &params).await?;
        debug!(case_id, count = nodes.len(), "graph nodes fetched");
        Ok(nodes)
    }

    /// Fetch all graph edges for a case
    #[instrument(skip(self))]
    pub async fn get_edges(&self, client_id: &str, case_id: &str) -> Result<Vec<GraphEdge>> {
        let params = [
            ("client_id", format!("eq.{client_id}")),
            ("case_id", format!("eq.{case_id}")),
        ];
        let edges: Vec<GraphEdge> = self.fetch_rows("/graph/edges", &params).await?;
        debug!(case_id, count = edges.len(), "graph edges fetched");
        Ok(edges)
    }

    /// Case name with the standard fallback; store failures degrade to the
    /// fallback rather than erroring.
    pub async fn get_case_name(&self, client_id: &str, case_id: &str) -> String {
        match self.get_case(client_id, case_id).await {
            Ok(Some(row)) => row.display_name(case_id),
            Ok(None) => format!("Case {case_id}"),
            Err(err) => {
                warn!(case_id, error = %err, "failed to fetch case name");
                format!("Case {case_id}")
            }
        }
    }

    /// Liveness probe against the store
    pub async fn health_check(&self) -> bool {
        match self.request("/").send().await {
            Ok(response) => response.status().is_success(),
            Err(err) => {
                debug!(error = %err, "case store health check failed");
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
    use serde_json::json;

    #[test]
    fn test_case_row_display_name_fallback() {
        let row = CaseRow {
            id: "case-1".into(),
            case_name: None,
            ..Default::default()
        };
        assert_eq!(row.display_name("case-1"), "Case case-1");

        let named = CaseRow {
            id: "case-1".into(),
            case_name: Some("Smith v. Jones".into()),
            ..Default::default()
        };
        assert_eq!(named.display_name("case-1"), "Smith v. Jones");

        let empty = CaseRow {
            id: "case-1".into(),
            case_name: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(empty.display_name("case-1"), "Case case-1");
    }

    #[test]
    fn test_node_property_accessors() {
        let node: GraphNode = serde_json::from_value(json!({
            "node_id": "n1",
            "entity_type": "PARTY",
            "case_id": "case-1",
            "properties": {
                "name": "Acme Corp",
                "role": "defendant",
                "confidence": 0.92,
                "representing": ["p1", "p2"]
            }
        }))
        .unwrap();

        assert_eq!(node.prop_str("name", "Unknown"), "Acme Corp");
        assert_eq!(node.prop_str("missing", "Unknown"), "Unknown");
        assert_eq!(node.prop_opt_str("role"), Some("defendant".to_string()));
        assert_eq!(node.prop_opt_str("missing"), None);
        assert!((node.prop_f64("confidence", 0.5) - 0.92).abs() < 1e-9);
        assert_eq!(node.prop_str_list("representing"), vec!["p1", "p2"]);
        assert!(node.prop_str_list("missing").is_empty());
    }

    #[test]
    fn test_case_row_parses_partial_json() {
        let row: CaseRow = serde_json::from_value(json!({
            "id": "case-1",
            "status": "closed",
            "jurisdiction": "federal"
        }))
        .unwrap();
        assert_eq!(row.status.as_deref(), Some("closed"));
        assert!(row.filing_date.is_none());
        assert!(row.trial_date.is_none());
    }
}
