//! Per-dimension analyzers
//!
//! One analyzer per context dimension. Each pulls from the knowledge graph
//! and the case store, transforms raw nodes into typed context, and
//! degrades to an empty context when a source is unavailable rather than
//! failing the whole request.

pub mod forum;
pub mod issues;
pub mod parties;
pub mod reasoning;
pub mod timeline;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{
    Dimension, DimensionQualityMetrics, WhatContext, WhenContext, WhereContext, WhoContext,
    WhyContext,
};

pub use forum::ForumAnalyzer;
pub use issues::IssuesAnalyzer;
pub use parties::PartiesAnalyzer;
pub use reasoning::ReasoningAnalyzer;
pub use timeline::TimelineAnalyzer;

/// Completeness threshold shared by dimension and overall scoring
pub const COMPLETENESS_THRESHOLD: f64 = 0.85;

/// Analyzed context for any single dimension
#[derive(Debug, Clone)]
pub enum DimensionContext {
    Who(WhoContext),
    What(WhatContext),
    Where(WhereContext),
    When(WhenContext),
    Why(WhyContext),
}

impl DimensionContext {
    pub fn dimension(&self) -> Dimension {
        match self {
            DimensionContext::Who(_) => Dimension::Who,
            DimensionContext::What(_) => Dimension::What,
            DimensionContext::Where(_) => Dimension::Where,
            DimensionContext::When(_) => Dimension::When,
            DimensionContext::Why(_) => Dimension::Why,
        }
    }

    pub fn case_name(&self) -> &str {
        match self {
            DimensionContext::Who(c) => &c.case_name,
            DimensionContext::What(c) => &c.case_name,
            DimensionContext::Where(c) => &c.case_name,
            DimensionContext::When(c) => &c.case_name,
            DimensionContext::Why(c) => &c.case_name,
        }
    }

    /// Extracted data points. WHERE counts as 3 only when jurisdiction,
    /// court, and venue are all present.
    pub fn data_points(&self) -> usize {
        match self {
            DimensionContext::Who(c) => c.data_points(),
            DimensionContext::What(c) => c.data_points(),
            DimensionContext::Where(c) => {
                let complete = !c.primary_jurisdiction.is_empty()
                    && !c.court.is_empty()
                    && !c.venue.is_empty();
                if complete {
                    3
                } else {
                    0
                }
            }
            DimensionContext::When(c) => c.data_points(),
            DimensionContext::Why(c) => c.data_points(),
        }
    }

    /// Completeness score for this dimension, in [0, 1].
    ///
    /// WHO/WHAT/WHY saturate at 10 data points. WHERE counts presence of
    /// jurisdiction, court, and venue out of 3. WHEN adds a 0.3 boost when
    /// the filing date is known.
    pub fn score(&self) -> f64 {
        match self {
            DimensionContext::Who(c) => (c.data_points() as f64 / 10.0).min(1.0),
            DimensionContext::What(c) => (c.data_points() as f64 / 10.0).min(1.0),
            DimensionContext::Where(c) => {
                let present = [
                    !c.primary_jurisdiction.is_empty(),
                    !c.court.is_empty(),
                    !c.venue.is_empty(),
                ];
                present.iter().filter(|p| **p).count() as f64 / 3.0
            }
            DimensionContext::When(c) => {
                let time_score = (c.data_points() as f64 / 10.0).min(1.0);
                let boost = if c.filing_date.is_some() { 0.3 } else { 0.0 };
                (time_score + boost).min(1.0)
            }
            DimensionContext::Why(c) => (c.data_points() as f64 / 10.0).min(1.0),
        }
    }

    /// Quality metrics derived from this context
    pub fn quality_metrics(&self) -> DimensionQualityMetrics {
        let score = self.score();
        DimensionQualityMetrics {
            dimension_name: self.dimension().as_str().to_string(),
            completeness_score: score,
            data_points: self.data_points(),
            confidence_avg: 0.9,
            is_sufficient: score >= COMPLETENESS_THRESHOLD,
        }
    }

    pub fn into_json(self) -> serde_json::Value {
        match self {
            DimensionContext::Who(c) => serde_json::to_value(c),
            DimensionContext::What(c) => serde_json::to_value(c),
            DimensionContext::Where(c) => serde_json::to_value(c),
            DimensionContext::When(c) => serde_json::to_value(c),
            DimensionContext::Why(c) => serde_json::to_value(c),
        }
        .unwrap_or(serde_json::Value::Null)
    }
}

/// Contract for dimension analyzers
#[async_trait]
pub trait DimensionAnalyzer: Send + Sync {
    fn dimension(&self) -> Dimension;

    /// Build the context for one case. Source failures inside the
    /// analyzer degrade to an empty context; an Err here means the
    /// dimension could not be built at all.
    async fn analyze(&self, client_id: &str, case_id: &str) -> Result<DimensionContext>;
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Deadline, Party};
    use chrono::{Duration, Utc};

    #[test]
    fn test_who_score_saturates_at_ten() {
        let mut who = WhoContext::empty("case-1", "Case case-1");
        for i in 0..12 {
            who.parties
                .push(Party::new(format!("P{i}"), "plaintiff", "person", "case-1").unwrap());
        }
        let ctx = DimensionContext::Who(who);
        assert_eq!(ctx.score(), 1.0);
        assert_eq!(ctx.data_points(), 12);
    }

    #[test]
    fn test_where_scores_presence_out_of_three() {
        let mut ctx = WhereContext::empty("case-1", "Case case-1");
        ctx.primary_jurisdiction = "Federal".into();
        ctx.court = "N.D. Cal.".into();
        let dim = DimensionContext::Where(ctx);
        assert!((dim.score() - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(dim.data_points(), 0);
    }

    #[test]
    fn test_where_complete_counts_three_points() {
        let mut ctx = WhereContext::empty("case-1", "Case case-1");
        ctx.primary_jurisdiction = "Federal".into();
        ctx.court = "N.D. Cal.".into();
        ctx.venue = "San Francisco".into();
        let dim = DimensionContext::Where(ctx);
        assert_eq!(dim.score(), 1.0);
        assert_eq!(dim.data_points(), 3);
    }

    #[test]
    fn test_when_filing_date_boost_is_clamped() {
        let now = Utc::now();
        let mut when = WhenContext::empty("case-1", "Case case-1");
        when.filing_date = Some(now - Duration::days(10));
        for i in 0..9 {
            when.upcoming_deadlines.push(Deadline {
                deadline_date: now + Duration::days(i + 1),
                deadline_type: "motion".into(),
                description: String::new(),
                case_id: "case-1".into(),
                is_met: false,
                priority: "medium".into(),
            });
        }
        // 0.9 from data points plus 0.3 boost clamps to 1.0
        let dim = DimensionContext::When(when);
        assert_eq!(dim.score(), 1.0);
    }

    #[test]
    fn test_empty_when_gets_only_boost() {
        let mut when = WhenContext::empty("case-1", "Case case-1");
        when.filing_date = Some(Utc::now());
        let dim = DimensionContext::When(when);
        assert!((dim.score() - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_quality_metrics_sufficiency() {
        let who = WhoContext::empty("case-1", "Case case-1");
        let metrics = DimensionContext::Who(who).quality_metrics();
        assert_eq!(metrics.dimension_name, "WHO");
        assert_eq!(metrics.completeness_score, 0.0);
        assert!(!metrics.is_sufficient);
    }
}
