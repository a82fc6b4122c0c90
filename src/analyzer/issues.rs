//! WHAT analyzer - causes of action, issues, doctrines, citations

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::{DimensionAnalyzer, DimensionContext};
use crate::clients::{CaseStoreClient, GraphNode};
use crate::error::Result;
use crate::model::{CauseOfAction, Citation, Dimension, WhatContext};

const LEGAL_ENTITY_TYPES: [&str; 5] = [
    "STATUTE_CITATION",
    "CASE_CITATION",
    "LEGAL_PRINCIPLE",
    "CAUSE_OF_ACTION",
    "DOCTRINE",
];

pub struct IssuesAnalyzer {
    store: Arc<CaseStoreClient>,
}

impl IssuesAnalyzer {
    pub fn new(store: Arc<CaseStoreClient>) -> Self {
        IssuesAnalyzer { store }
    }

    fn extract_causes(nodes: &[GraphNode], case_id: &str) -> Vec<CauseOfAction> {
        nodes
            .iter()
            .filter(|n| n.entity_type == "CAUSE_OF_ACTION")
            .map(|n| {
                let mut cause = CauseOfAction::new(
                    n.prop_str("name", "Unknown Cause"),
                    n.prop_str("description", ""),
                    case_id,
                );
                cause.id = n.node_id.clone();
                cause.elements = n.prop_str_list("elements");
                cause
            })
            .collect()
    }

    /// Named values deduplicated, falling back to the node text
    fn extract_named(nodes: &[GraphNode], entity_type: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        nodes
            .iter()
            .filter(|n| n.entity_type == entity_type)
            .filter_map(|n| n.prop_opt_str("name").or_else(|| n.prop_opt_str("text")))
            .filter(|name| seen.insert(name.clone()))
            .collect()
    }

    fn extract_citations(nodes: &[GraphNode], entity_type: &str, kind: &str, case_id: &str) -> Vec<Citation> {
        nodes
            .iter()
            .filter(|n| n.entity_type == entity_type)
            .map(|n| Citation {
                text: n.prop_str("text", ""),
                citation_type: kind.to_string(),
                jurisdiction: n.prop_str("jurisdiction", "federal"),
                confidence: n.prop_f64("confidence", 0.9),
                case_id: Some(case_id.to_string()),
            })
            .collect()
    }

    /// More causes, issues, and statutes means a more complex case.
    /// Saturates at 20 combined.
    fn complexity(cause_count: usize, issue_count: usize, statute_count: usize) -> f64 {
        ((cause_count + issue_count + statute_count) as f64 / 20.0).min(1.0)
    }

    fn primary_theory(causes: &[CauseOfAction], issues: &[String]) -> Option<String> {
        causes
            .first()
            .map(|c| c.name.clone())
            .or_else(|| issues.first().cloned())
    }
}

#[async_trait]
impl DimensionAnalyzer for IssuesAnalyzer {
    fn dimension(&self) -> Dimension {
        Dimension::What
    }

    #[instrument(skip(self), fields(dimension = "WHAT"))]
    async fn analyze(&self, client_id: &str, case_id: &str) -> Result<DimensionContext> {
        let nodes = match self
            .store
            .get_nodes(client_id, case_id, &LEGAL_ENTITY_TYPES)
            .await
        {
            Ok(nodes) => nodes,
            Err(err) => {
                warn!(case_id, error = %err, "store query failed, degrading to empty context");
                Vec::new()
            }
        };

        let causes_of_action = Self::extract_causes(&nodes, case_id);
        let legal_issues = Self::extract_named(&nodes, "LEGAL_PRINCIPLE");
        let doctrines = Self::extract_named(&nodes, "DOCTRINE");
        let statutes = Self::extract_citations(&nodes, "STATUTE_CITATION", "statute", case_id);
        let case_citations = Self::extract_citations(&nodes, "CASE_CITATION", "case_law", case_id);

        let primary_legal_theory = Self::primary_theory(&causes_of_action, &legal_issues);
        let issue_complexity = Self::complexity(
            causes_of_action.len(),
            legal_issues.len(),
            statutes.len(),
        );
        let case_name = self.store.get_case_name(client_id, case_id).await;

        info!(
            case_id,
            causes = causes_of_action.len(),
            statutes = statutes.len(),
            case_citations = case_citations.len(),
            "WHAT analysis complete"
        );

        Ok(DimensionContext::What(WhatContext {
            case_id: case_id.to_string(),
            case_name,
            causes_of_action,
            legal_issues,
            doctrines,
            statutes,
            case_citations,
            primary_legal_theory,
            issue_complexity,
            jurisdiction_type: "federal".to_string(),
        }))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node(entity_type: &str, props: serde_json::Value) -> GraphNode {
        serde_json::from_value(json!({
            "node_id": format!("n-{}", props.get("name").and_then(|v| v.as_str()).unwrap_or("x")),
            "entity_type": entity_type,
            "properties": props
        }))
        .unwrap()
    }

    #[test]
    fn test_extract_causes() {
        let nodes = vec![node(
            "CAUSE_OF_ACTION",
            json!({
                "name": "Negligence",
                "description": "Breach of duty of care",
                "elements": ["duty", "breach", "causation", "damages"]
            }),
        )];
        let causes = IssuesAnalyzer::extract_causes(&nodes, "case-1");
        assert_eq!(causes.len(), 1);
        assert_eq!(causes[0].name, "Negligence");
        assert_eq!(causes[0].elements.len(), 4);
    }

    #[test]
    fn test_extract_named_deduplicates() {
        let nodes = vec![
            node("LEGAL_PRINCIPLE", json!({"name": "Duty of care"})),
            node("LEGAL_PRINCIPLE", json!({"name": "Duty of care"})),
            node("LEGAL_PRINCIPLE", json!({"text": "Strict liability"})),
        ];
        let issues = IssuesAnalyzer::extract_named(&nodes, "LEGAL_PRINCIPLE");
        assert_eq!(issues.len(), 2);
    }

    #[test]
    fn test_extract_statute_citations() {
        let nodes = vec![node(
            "STATUTE_CITATION",
            json!({"text": "18 U.S.C. § 922(g)(8)", "jurisdiction": "federal", "confidence": 0.95}),
        )];
        let statutes = IssuesAnalyzer::extract_citations(&nodes, "STATUTE_CITATION", "statute", "case-1");
        assert_eq!(statutes.len(), 1);
        assert_eq!(statutes[0].citation_type, "statute");
        assert!((statutes[0].confidence - 0.95).abs() < 1e-9);
    }

    #[test]
    fn test_complexity_saturates() {
        assert_eq!(IssuesAnalyzer::complexity(0, 0, 0), 0.0);
        assert!((IssuesAnalyzer::complexity(2, 3, 5) - 0.5).abs() < 1e-9);
        assert_eq!(IssuesAnalyzer::complexity(10, 10, 10), 1.0);
    }

    #[test]
    fn test_primary_theory_prefers_causes() {
        let causes = vec![CauseOfAction::new("Negligence", "", "case-1")];
        let issues = vec!["Duty of care".to_string()];
        assert_eq!(
            IssuesAnalyzer::primary_theory(&causes, &issues),
            Some("Negligence".to_string())
        );
        assert_eq!(
            IssuesAnalyzer::primary_theory(&[], &issues),
            Some("Duty of care".to_string())
        );
        assert_eq!(IssuesAnalyzer::primary_theory(&[], &[]), None);
    }
}
