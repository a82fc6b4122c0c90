//! WHEN analyzer - timeline, deadlines, urgency

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::{DimensionAnalyzer, DimensionContext};
use crate::clients::{CaseRow, CaseStoreClient};
use crate::error::Result;
use crate::model::{Deadline, Dimension, TimelineEvent, WhenContext};

pub struct TimelineAnalyzer {
    store: Arc<CaseStoreClient>,
}

impl TimelineAnalyzer {
    pub fn new(store: Arc<CaseStoreClient>) -> Self {
        TimelineAnalyzer { store }
    }

    /// Deadlines derived from the case row's scheduling columns
    fn deadlines_from_row(row: &CaseRow, case_id: &str) -> Vec<Deadline> {
        let mut deadlines = Vec::new();
        let mut push = |date: Option<DateTime<Utc>>, kind: &str, description: &str, priority: &str| {
            if let Some(date) = date {
                deadlines.push(Deadline {
                    deadline_date: date,
                    deadline_type: kind.to_string(),
                    description: description.to_string(),
                    case_id: case_id.to_string(),
                    is_met: false,
                    priority: priority.to_string(),
                });
            }
        };
        push(row.discovery_cutoff, "discovery", "Discovery cutoff", "high");
        push(row.motion_deadline, "motion", "Motion filing deadline", "high");
        push(row.trial_date, "trial", "Trial date", "high");
        push(
            row.statute_of_limitations,
            "statute_of_limitations",
            "Statute of limitations",
            "high",
        );
        deadlines
    }

    /// Timeline seeded from the filing and incident dates
    fn timeline_from_row(row: &CaseRow, case_id: &str) -> Vec<TimelineEvent> {
        let mut timeline = Vec::new();
        if let Some(date) = row.incident_date {
            timeline.push(TimelineEvent {
                date,
                event_type: "incident".to_string(),
                description: "Underlying incident".to_string(),
                case_id: case_id.to_string(),
            });
        }
        if let Some(date) = row.filing_date {
            timeline.push(TimelineEvent {
                date,
                event_type: "filing".to_string(),
                description: "Case filed".to_string(),
                case_id: case_id.to_string(),
            });
        }
        timeline
    }

    /// 1.0 with a deadline inside 7 days, 0.7 inside 30, 0.5 further out,
    /// 0.3 with nothing upcoming
    fn urgency(upcoming: &[Deadline], now: DateTime<Utc>) -> f64 {
        if upcoming.is_empty() {
            return 0.3;
        }
        let days_to = |d: &Deadline| (d.deadline_date - now).num_days();
        if upcoming.iter().any(|d| days_to(d) <= 7) {
            1.0
        } else if upcoming.iter().any(|d| days_to(d) <= 30) {
            0.7
        } else {
            0.5
        }
    }

    fn build_context(row: &CaseRow, case_id: &str, now: DateTime<Utc>) -> WhenContext {
        let deadlines = Self::deadlines_from_row(row, case_id);
        let (upcoming, past): (Vec<Deadline>, Vec<Deadline>) = deadlines
            .into_iter()
            .partition(|d| d.deadline_date > now);

        let days_until_next = upcoming
            .iter()
            .map(|d| (d.deadline_date - now).num_days())
            .min();
        let urgency_score = Self::urgency(&upcoming, now);
        let timeline = Self::timeline_from_row(row, case_id);
        let case_age_days = row
            .filing_date
            .map(|filed| (now - filed).num_days().max(0))
            .unwrap_or(0);

        WhenContext {
            case_id: case_id.to_string(),
            case_name: row.display_name(case_id),
            filing_date: row.filing_date,
            incident_date: row.incident_date,
            timeline,
            upcoming_deadlines: upcoming,
            past_deadlines: past,
            discovery_cutoff: row.discovery_cutoff,
            motion_deadline: row.motion_deadline,
            trial_date: row.trial_date,
            statute_of_limitations: row.statute_of_limitations,
            days_until_next_deadline: days_until_next,
            urgency_score,
            case_age_days,
        }
    }
}

#[async_trait]
impl DimensionAnalyzer for TimelineAnalyzer {
    fn dimension(&self) -> Dimension {
        Dimension::When
    }

    #[instrument(skip(self), fields(dimension = "WHEN"))]
    async fn analyze(&self, client_id: &str, case_id: &str) -> Result<DimensionContext> {
        let now = Utc::now();
        let context = match self.store.get_case(client_id, case_id).await {
            Ok(Some(row)) => Self::build_context(&row, case_id, now),
            Ok(None) => {
                warn!(case_id, "case not found in store");
                WhenContext::empty(case_id, format!("Case {case_id}"))
            }
            Err(err) => {
                warn!(case_id, error = %err, "case dates query failed");
                WhenContext::empty(case_id, format!("Case {case_id}"))
            }
        };

        info!(
            case_id,
            events = context.timeline.len(),
            upcoming = context.upcoming_deadlines.len(),
            urgency = context.urgency_score,
            "WHEN analysis complete"
        );
        Ok(DimensionContext::When(context))
    }
}

// =============================================================================
// Tests
// =============================================================================
