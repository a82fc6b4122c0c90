//! WHY analyzer - precedents, theories, argument strength

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::{DimensionAnalyzer, DimensionContext};
use crate::clients::{CaseStoreClient, GraphEntity, GraphRagClient};
use crate::error::Result;
use crate::model::{Dimension, PrecedentAnalysis, WhyContext};

pub struct ReasoningAnalyzer {
    graphrag: Arc<GraphRagClient>,
    store: Arc<CaseStoreClient>,
}

impl ReasoningAnalyzer {
    pub fn new(graphrag: Arc<GraphRagClient>, store: Arc<CaseStoreClient>) -> Self {
        ReasoningAnalyzer { graphrag, store }
    }

    /// Map precedent entities into analyses for one favorability bucket.
    /// Entities without a favorability property land in neither bucket.
    fn categorize(entities: &[GraphEntity], favorability: &str) -> Vec<PrecedentAnalysis> {
        entities
            .iter()
            .filter(|e| {
                e.properties
                    .get("favorability")
                    .and_then(|v| v.as_str())
                    .map(|f| f.eq_ignore_ascii_case(favorability))
                    .unwrap_or(false)
            })
            .map(|e| PrecedentAnalysis {
                case_name: e.entity_text.clone(),
                citation: e
                    .properties
                    .get("citation")
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string(),
                relevance_score: e.confidence_score.clamp(0.0, 1.0),
                holding: e
                    .properties
                    .get("holding")
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string(),
                distinguishing_factors: e
                    .properties
                    .get("distinguishing_factors")
                    .and_then(|v| v.as_array())
                    .map(|items| {
                        items
                            .iter()
                            .filter_map(|v| v.as_str().map(|s| s.to_string()))
                            .collect()
                    })
                    .unwrap_or_default(),
                favorability: favorability.to_string(),
            })
            .collect()
    }

    /// Supporting relevance mass over total relevance mass; 0.5 when there
    /// are no precedents either way
    fn argument_strength(
        supporting: &[PrecedentAnalysis],
        opposing: &[PrecedentAnalysis],
    ) -> f64 {
        if supporting.is_empty() && opposing.is_empty() {
            return 0.5;
        }
        let support: f64 = supporting.iter().map(|p| p.relevance_score).sum();
        let oppose: f64 = opposing.iter().map(|p| p.relevance_score).sum();
        let total = support + oppose;
        if total == 0.0 {
            0.5
        } else {
            support / total
        }
    }
}

#[async_trait]
impl DimensionAnalyzer for ReasoningAnalyzer {
    fn dimension(&self) -> Dimension {
        Dimension::Why
    }

    #[instrument(skip(self), fields(dimension = "WHY"))]
    async fn analyze(&self, client_id: &str, case_id: &str) -> Result<DimensionContext> {
        let issue = format!("relevant precedent cases for case {case_id}");
        let precedents = match self
            .graphrag
            .search_precedents(client_id, &issue, None, None, 20)
            .await
        {
            Ok(entities) => entities,
            Err(err) => {
                warn!(case_id, error = %err, "precedent search failed, degrading to empty context");
                Vec::new()
            }
        };

        let supporting = Self::categorize(&precedents, "supporting");
        let opposing = Self::categorize(&precedents, "opposing");
        let argument_strength = Self::argument_strength(&supporting, &opposing);
        let case_name = self.store.get_case_name(client_id, case_id).await;

        info!(
            case_id,
            supporting = supporting.len(),
            opposing = opposing.len(),
            argument_strength,
            "WHY analysis complete"
        );

        Ok(DimensionContext::Why(WhyContext {
            supporting_precedents: supporting,
            opposing_precedents: opposing,
            argument_strength,
            ..WhyContext::empty(case_id, case_name)
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

    fn precedent(name: &str, favorability: &str, confidence: f64) -> GraphEntity {
        serde_json::from_value(json!({
            "entity_id": name,
            "entity_text": name,
            "entity_type": "CASE_CITATION",
            "confidence_score": confidence,
            "properties": {
                "favorability": favorability,
                "citation": "123 F.3d 456",
                "holding": "Held for plaintiff"
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_categorize_by_favorability() {
        let entities = vec![
            precedent("Smith v. Jones", "supporting", 0.9),
            precedent("Doe v. Roe", "opposing", 0.6),
            precedent("Neutral v. Case", "neutral", 0.8),
        ];
        let supporting = ReasoningAnalyzer::categorize(&entities, "supporting");
        let opposing = ReasoningAnalyzer::categorize(&entities, "opposing");
        assert_eq!(supporting.len(), 1);
        assert_eq!(supporting[0].case_name, "Smith v. Jones");
        assert_eq!(supporting[0].citation, "123 F.3d 456");
        assert_eq!(opposing.len(), 1);
    }

    #[test]
    fn test_argument_strength_default() {
        assert_eq!(ReasoningAnalyzer::argument_strength(&[], &[]), 0.5);
    }

    #[test]
    fn test_argument_strength_ratio() {
        let entities = vec![
            precedent("A", "supporting", 0.9),
            precedent("B", "supporting", 0.6),
            precedent("C", "opposing", 0.5),
        ];
        let supporting = ReasoningAnalyzer::categorize(&entities, "supporting");
        let opposing = ReasoningAnalyzer::categorize(&entities, "opposing");
        let strength = ReasoningAnalyzer::argument_strength(&supporting, &opposing);
        assert!((strength - 1.5 / 2.0).abs() < 1e-9);
    }
}
