//! WHO analyzer - parties, judges, attorneys, witnesses

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::{DimensionAnalyzer, DimensionContext};
use crate::clients::{CaseStoreClient, GraphNode, GraphRagClient, SearchType};
use crate::error::Result;
use crate::model::{Attorney, Dimension, Judge, Party, WhoContext, Witness};

pub struct PartiesAnalyzer {
    graphrag: Arc<GraphRagClient>,
    store: Arc<CaseStoreClient>,
}

impl PartiesAnalyzer {
    pub fn new(graphrag: Arc<GraphRagClient>, store: Arc<CaseStoreClient>) -> Self {
        PartiesAnalyzer { graphrag, store }
    }

    fn extract_parties(nodes: &[GraphNode], case_id: &str) -> Vec<Party> {
        nodes
            .iter()
            .filter(|n| n.entity_type == "PARTY")
            .filter_map(|n| {
                let name = n.prop_str("name", "Unknown Party");
                let role = n.prop_str("role", "unknown");
                let entity_type = n.prop_str("entity_type", "person");
                match Party::new(name, &role, entity_type, case_id) {
                    Ok(mut party) => {
                        party.id = n.node_id.clone();
                        party.metadata = n.properties.clone();
                        Some(party)
                    }
                    Err(err) => {
                        warn!(node_id = %n.node_id, error = %err, "skipping party node");
                        None
                    }
                }
            })
            .collect()
    }

    fn extract_judges(nodes: &[GraphNode], case_id: &str) -> Vec<Judge> {
        nodes
            .iter()
            .filter(|n| n.entity_type == "JUDGE")
            .map(|n| {
                let mut judge = Judge::new(
                    n.prop_str("name", "Unknown Judge"),
                    n.prop_str("court", "Unknown Court"),
                    case_id,
                );
                judge.id = n.node_id.clone();
                judge
            })
            .collect()
    }

    fn extract_attorneys(nodes: &[GraphNode], case_id: &str) -> Vec<Attorney> {
        nodes
            .iter()
            .filter(|n| n.entity_type == "ATTORNEY")
            .map(|n| {
                let mut attorney = Attorney::new(n.prop_str("name", "Unknown Attorney"), case_id);
                attorney.id = n.node_id.clone();
                attorney.firm = n.prop_opt_str("firm");
                attorney.bar_number = n.prop_opt_str("bar_number");
                attorney.representing = n.prop_str_list("representing");
                attorney
            })
            .collect()
    }

    fn extract_witnesses(nodes: &[GraphNode], case_id: &str) -> Vec<Witness> {
        nodes
            .iter()
            .filter(|n| n.entity_type == "WITNESS")
            .map(|n| Witness {
                id: n.node_id.clone(),
                name: n.prop_str("name", "Unknown Witness"),
                witness_type: n.prop_str("witness_type", "fact"),
                representing_party: n.prop_opt_str("representing_party"),
                case_id: case_id.to_string(),
                expertise: n.prop_opt_str("expertise"),
            })
            .collect()
    }

    fn representation_map(attorneys: &[Attorney]) -> HashMap<String, String> {
        let mut map = HashMap::new();
        for attorney in attorneys {
            for party_id in &attorney.representing {
                map.insert(party_id.clone(), attorney.id.clone());
            }
        }
        map
    }

    async fn party_relationships(
        &self,
        client_id: &str,
        case_id: &str,
    ) -> HashMap<String, Vec<String>> {
        let mut relationships: HashMap<String, Vec<String>> = HashMap::new();
        match self.store.get_edges(client_id, case_id).await {
            Ok(edges) => {
                for edge in edges {
                    relationships
                        .entry(edge.source_node_id)
                        .or_default()
                        .push(edge.target_node_id);
                }
            }
            Err(err) => {
                warn!(case_id, error = %err, "failed to build party relationships");
            }
        }
        relationships
    }
}

#[async_trait]
impl DimensionAnalyzer for PartiesAnalyzer {
    fn dimension(&self) -> Dimension {
        Dimension::Who
    }

    #[instrument(skip(self), fields(dimension = "WHO"))]
    async fn analyze(&self, client_id: &str, case_id: &str) -> Result<DimensionContext> {
        // Graph query is advisory; node extraction comes from the store
        let query = format!(
            "Find all parties, judges, attorneys, and witnesses in case {case_id}. \
             Include their roles, relationships, and metadata."
        );
        if let Err(err) = self
            .graphrag
            .query_case_graph(client_id, case_id, &query, SearchType::Local)
            .await
        {
            warn!(case_id, error = %err, "graph query failed, continuing with store data");
        }

        let nodes = match self
            .store
            .get_nodes(client_id, case_id, &["PARTY", "JUDGE", "ATTORNEY", "WITNESS"])
            .await
        {
            Ok(nodes) => nodes,
            Err(err) => {
                warn!(case_id, error = %err, "store query failed, degrading to empty context");
                Vec::new()
            }
        };

        let parties = Self::extract_parties(&nodes, case_id);
        let judges = Self::extract_judges(&nodes, case_id);
        let attorneys = Self::extract_attorneys(&nodes, case_id);
        let witnesses = Self::extract_witnesses(&nodes, case_id);
        let representation_map = Self::representation_map(&attorneys);
        let party_relationships = self.party_relationships(client_id, case_id).await;
        let case_name = self.store.get_case_name(client_id, case_id).await;

        info!(
            case_id,
            parties = parties.len(),
            judges = judges.len(),
            attorneys = attorneys.len(),
            witnesses = witnesses.len(),
            "WHO analysis complete"
        );

        Ok(DimensionContext::Who(WhoContext {
            case_id: case_id.to_string(),
            case_name,
            parties,
            judges,
            attorneys,
            witnesses,
            party_relationships,
            representation_map,
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
            "node_id": format!("n-{entity_type}"),
            "entity_type": entity_type,
            "case_id": "case-1",
            "properties": props
        }))
        .unwrap()
    }

    #[test]
    fn test_extract_parties_validates_roles() {
        let nodes = vec![
            node("PARTY", json!({"name": "Acme", "role": "plaintiff"})),
            node("PARTY", json!({"name": "Ghost", "role": "bystander"})),
            node("JUDGE", json!({"name": "Hon. Smith"})),
        ];
        let parties = PartiesAnalyzer::extract_parties(&nodes, "case-1");
        assert_eq!(parties.len(), 1);
        assert_eq!(parties[0].name, "Acme");
        assert_eq!(parties[0].id, "n-PARTY");
    }

    #[test]
    fn test_extract_judges_and_witnesses() {
        let nodes = vec![
            node("JUDGE", json!({"name": "Hon. Smith", "court": "N.D. Cal."})),
            node(
                "WITNESS",
                json!({"name": "Dr. Lee", "witness_type": "expert", "expertise": "ballistics"}),
            ),
        ];
        let judges = PartiesAnalyzer::extract_judges(&nodes, "case-1");
        assert_eq!(judges.len(), 1);
        assert_eq!(judges[0].court, "N.D. Cal.");

        let witnesses = PartiesAnalyzer::extract_witnesses(&nodes, "case-1");
        assert_eq!(witnesses.len(), 1);
        assert_eq!(witnesses[0].witness_type, "expert");
        assert_eq!(witnesses[0].expertise.as_deref(), Some("ballistics"));
    }

    #[test]
    fn test_representation_map() {
        let nodes = vec![node(
            "ATTORNEY",
            json!({"name": "J. Doe", "representing": ["p1", "p2"]}),
        )];
        let attorneys = PartiesAnalyzer::extract_attorneys(&nodes, "case-1");
        let map = PartiesAnalyzer::representation_map(&attorneys);
        assert_eq!(map.get("p1"), Some(&"n-ATTORNEY".to_string()));
        assert_eq!(map.get("p2"), Some(&"n-ATTORNEY".to_string()));
    }
}
