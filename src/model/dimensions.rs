//! Typed WHO/WHAT/WHERE/WHEN/WHY context models
//!
//! - WHO: parties, judges, attorneys, witnesses
//! - WHAT: legal issues, claims, citations, causes of action
//! - WHERE: jurisdiction, venue, court information
//! - WHEN: timeline, deadlines, case age, urgency
//! - WHY: legal reasoning, precedents, argument analysis
//!
//! Every model carries `case_id` so context stays case-scoped end to end.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::{Error, Result};

// =============================================================================
// WHO dimension
// =============================================================================

/// Legal roles a party may hold
pub const VALID_PARTY_ROLES: [&str; 8] = [
    "plaintiff",
    "defendant",
    "third_party",
    "intervenor",
    "petitioner",
    "respondent",
    "appellant",
    "appellee",
];

/// A party to a legal case
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Party {
    pub id: String,
    pub name: String,
    /// Normalized to lowercase, validated against [`VALID_PARTY_ROLES`]
    pub role: String,
    /// person, corporation, government_entity
    pub entity_type: String,
    pub case_id: String,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Party {
    /// Build a party, validating and normalizing the role.
    pub fn new(
        name: impl Into<String>,
        role: &str,
        entity_type: impl Into<String>,
        case_id: impl Into<String>,
    ) -> Result<Self> {
        let role = role.to_ascii_lowercase();
        if !VALID_PARTY_ROLES.contains(&role.as_str()) {
            return Err(Error::InvalidPartyRole(role));
        }
        Ok(Party {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            role,
            entity_type: entity_type.into(),
            case_id: case_id.into(),
            metadata: HashMap::new(),
        })
    }
}

/// A judge assigned to a case
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Judge {
    pub id: String,
    pub name: String,
    pub court: String,
    pub case_id: String,
    #[serde(default)]
    pub assignment_date: Option<DateTime<Utc>>,
    /// Historical case counts keyed by party name
    #[serde(default)]
    pub history_with_parties: HashMap<String, u32>,
}

impl Judge {
    pub fn new(
        name: impl Into<String>,
        court: impl Into<String>,
        case_id: impl Into<String>,
    ) -> Self {
        Judge {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            court: court.into(),
            case_id: case_id.into(),
            assignment_date: None,
            history_with_parties: HashMap::new(),
        }
    }
}

/// An attorney of record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attorney {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub firm: Option<String>,
    #[serde(default)]
    pub bar_number: Option<String>,
    /// Party IDs this attorney represents
    #[serde(default)]
    pub representing: Vec<String>,
    pub case_id: String,
}

impl Attorney {
    pub fn new(name: impl Into<String>, case_id: impl Into<String>) -> Self {
        Attorney {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            firm: None,
            bar_number: None,
            representing: Vec::new(),
            case_id: case_id.into(),
        }
    }
}

/// A witness
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Witness {
    pub id: String,
    pub name: String,
    /// expert, fact, character
    pub witness_type: String,
    #[serde(default)]
    pub representing_party: Option<String>,
    pub case_id: String,
    #[serde(default)]
    pub expertise: Option<String>,
}

/// Complete WHO context for a case
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhoContext {
    pub case_id: String,
    pub case_name: String,
    #[serde(default)]
    pub parties: Vec<Party>,
    #[serde(default)]
    pub judges: Vec<Judge>,
    #[serde(default)]
    pub attorneys: Vec<Attorney>,
    #[serde(default)]
    pub witnesses: Vec<Witness>,
    #[serde(default)]
    pub party_relationships: HashMap<String, Vec<String>>,
    /// party_id -> attorney_id
    #[serde(default)]
    pub representation_map: HashMap<String, String>,
}

impl WhoContext {
    /// Empty context for a case, used when analysis degrades
    pub fn empty(case_id: impl Into<String>, case_name: impl Into<String>) -> Self {
        WhoContext {
            case_id: case_id.into(),
            case_name: case_name.into(),
            parties: Vec::new(),
            judges: Vec::new(),
            attorneys: Vec::new(),
            witnesses: Vec::new(),
            party_relationships: HashMap::new(),
            representation_map: HashMap::new(),
        }
    }

    pub fn data_points(&self) -> usize {
        self.parties.len() + self.judges.len() + self.attorneys.len() + self.witnesses.len()
    }

    pub fn parties_by_role(&self, role: &str) -> Vec<&Party> {
        let role = role.to_ascii_lowercase();
        self.parties.iter().filter(|p| p.role == role).collect()
    }
}

// =============================================================================
// WHAT dimension
// =============================================================================

/// A legal citation (statute, case law, regulation)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
    pub text: String,
    /// statute, case_law, regulation
    #[serde(rename = "type")]
    pub citation_type: String,
    pub jurisdiction: String,
    /// Extraction confidence, clamped to [0, 1]
    pub confidence: f64,
    #[serde(default)]
    pub case_id: Option<String>,
}

/// A cause of action and the elements to prove it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CauseOfAction {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub elements: Vec<String>,
    pub case_id: String,
}

impl CauseOfAction {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        case_id: impl Into<String>,
    ) -> Self {
        CauseOfAction {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            description: description.into(),
            elements: Vec::new(),
            case_id: case_id.into(),
        }
    }
}

/// Complete WHAT context for a case
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatContext {
    pub case_id: String,
    pub case_name: String,
    #[serde(default)]
    pub causes_of_action: Vec<CauseOfAction>,
    #[serde(default)]
    pub legal_issues: Vec<String>,
    #[serde(default)]
    pub doctrines: Vec<String>,
    #[serde(default)]
    pub statutes: Vec<Citation>,
    #[serde(default)]
    pub case_citations: Vec<Citation>,
    #[serde(default)]
    pub primary_legal_theory: Option<String>,
    /// (causes + issues + statutes) / 20, capped at 1.0
    pub issue_complexity: f64,
    /// federal, state, mixed
    pub jurisdiction_type: String,
}

impl WhatContext {
    pub fn empty(case_id: impl Into<String>, case_name: impl Into<String>) -> Self {
        WhatContext {
            case_id: case_id.into(),
            case_name: case_name.into(),
            causes_of_action: Vec::new(),
            legal_issues: Vec::new(),
            doctrines: Vec::new(),
            statutes: Vec::new(),
            case_citations: Vec::new(),
            primary_legal_theory: None,
            issue_complexity: 0.5,
            jurisdiction_type: "federal".to_string(),
        }
    }

    pub fn data_points(&self) -> usize {
        self.causes_of_action.len()
            + self.legal_issues.len()
            + self.statutes.len()
            + self.case_citations.len()
    }
}

// =============================================================================
// WHERE dimension
// =============================================================================

/// A local court rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalRule {
    pub rule_number: String,
    pub description: String,
    pub jurisdiction: String,
}

/// Complete WHERE context for a case
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhereContext {
    pub case_id: String,
    pub case_name: String,
    pub primary_jurisdiction: String,
    pub court: String,
    pub venue: String,
    #[serde(default)]
    pub judge_chambers: Option<String>,
    #[serde(default)]
    pub local_rules: Vec<LocalRule>,
    #[serde(default)]
    pub filing_requirements: Vec<String>,
    #[serde(default)]
    pub related_proceedings: Vec<serde_json::Value>,
}

impl WhereContext {
    pub fn empty(case_id: impl Into<String>, case_name: impl Into<String>) -> Self {
        WhereContext {
            case_id: case_id.into(),
            case_name: case_name.into(),
            primary_jurisdiction: String::new(),
            court: String::new(),
            venue: String::new(),
            judge_chambers: None,
            local_rules: Vec::new(),
            filing_requirements: Vec::new(),
            related_proceedings: Vec::new(),
        }
    }

    pub fn full_court_name(&self) -> String {
        format!("{}, {}", self.court, self.primary_jurisdiction)
    }
}

// =============================================================================
// WHEN dimension
// =============================================================================

/// An event on the case timeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub date: DateTime<Utc>,
    /// filing, hearing, motion, order
    pub event_type: String,
    pub description: String,
    pub case_id: String,
}

/// A case deadline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deadline {
    pub deadline_date: DateTime<Utc>,
    /// discovery, motion, trial
    pub deadline_type: String,
    pub description: String,
    pub case_id: String,
    #[serde(default)]
    pub is_met: bool,
    /// high, medium, low
    #[serde(default = "default_priority")]
    pub priority: String,
}

fn default_priority() -> String {
    "medium".to_string()
}

/// Complete WHEN context for a case
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhenContext {
    pub case_id: String,
    pub case_name: String,
    #[serde(default)]
    pub filing_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub incident_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub timeline: Vec<TimelineEvent>,
    #[serde(default)]
    pub upcoming_deadlines: Vec<Deadline>,
    #[serde(default)]
    pub past_deadlines: Vec<Deadline>,
    #[serde(default)]
    pub discovery_cutoff: Option<DateTime<Utc>>,
    #[serde(default)]
    pub motion_deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub trial_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub statute_of_limitations: Option<DateTime<Utc>>,
    #[serde(default)]
    pub days_until_next_deadline: Option<i64>,
    /// 1.0 deadline within 7 days, 0.7 within 30, 0.5 further out, 0.3 none
    pub urgency_score: f64,
    pub case_age_days: i64,
}

impl WhenContext {
    pub fn empty(case_id: impl Into<String>, case_name: impl Into<String>) -> Self {
        WhenContext {
            case_id: case_id.into(),
            case_name: case_name.into(),
            filing_date: None,
            incident_date: None,
            timeline: Vec::new(),
            upcoming_deadlines: Vec::new(),
            past_deadlines: Vec::new(),
            discovery_cutoff: None,
            motion_deadline: None,
            trial_date: None,
            statute_of_limitations: None,
            days_until_next_deadline: None,
            urgency_score: 0.3,
            case_age_days: 0,
        }
    }

    pub fn data_points(&self) -> usize {
        self.timeline.len() + self.upcoming_deadlines.len() + self.past_deadlines.len()
    }

    /// Case age in days from the filing date, never negative
    pub fn case_age(&self, now: DateTime<Utc>) -> i64 {
        match self.filing_date {
            Some(filed) => (now - filed).num_days().max(0),
            None => 0,
        }
    }

    /// Soonest upcoming deadline, if any
    pub fn next_deadline(&self) -> Option<&Deadline> {
        self.upcoming_deadlines.iter().min_by_key(|d| d.deadline_date)
    }
}

// =============================================================================
// WHY dimension
// =============================================================================

/// Analysis of a single precedent against the current case
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrecedentAnalysis {
    pub case_name: String,
    pub citation: String,
    /// Relevance to the current case, [0, 1]
    pub relevance_score: f64,
    pub holding: String,
    #[serde(default)]
    pub distinguishing_factors: Vec<String>,
    /// supporting, opposing, neutral
    #[serde(default = "default_favorability")]
    pub favorability: String,
}

fn default_favorability() -> String {
    "neutral".to_string()
}

/// A legal theory with its supporting precedents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegalTheory {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Theory strength, [0, 1]
    pub strength: f64,
    #[serde(default)]
    pub supporting_precedents: Vec<String>,
    pub case_id: String,
}

impl LegalTheory {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        strength: f64,
        case_id: impl Into<String>,
    ) -> Self {
        LegalTheory {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            description: description.into(),
            strength: strength.clamp(0.0, 1.0),
            supporting_precedents: Vec::new(),
            case_id: case_id.into(),
        }
    }
}

/// Complete WHY context for a case
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhyContext {
    pub case_id: String,
    pub case_name: String,
    #[serde(default)]
    pub legal_theories: Vec<LegalTheory>,
    #[serde(default)]
    pub argument_outline: Vec<serde_json::Value>,
    #[serde(default)]
    pub supporting_precedents: Vec<PrecedentAnalysis>,
    #[serde(default)]
    pub opposing_precedents: Vec<PrecedentAnalysis>,
    #[serde(default)]
    pub distinguishing_factors: Vec<String>,
    /// Supporting relevance mass over total relevance mass, 0.5 default
    pub argument_strength: f64,
    #[serde(default)]
    pub risk_factors: Vec<String>,
    #[serde(default)]
    pub mitigation_strategies: Vec<String>,
    #[serde(default)]
    pub similar_case_outcomes: HashMap<String, f64>,
    #[serde(default)]
    pub judge_ruling_patterns: HashMap<String, f64>,
}

impl WhyContext {
    pub fn empty(case_id: impl Into<String>, case_name: impl Into<String>) -> Self {
        WhyContext {
            case_id: case_id.into(),
            case_name: case_name.into(),
            legal_theories: Vec::new(),
            argument_outline: Vec::new(),
            supporting_precedents: Vec::new(),
            opposing_precedents: Vec::new(),
            distinguishing_factors: Vec::new(),
            argument_strength: 0.5,
            risk_factors: Vec::new(),
            mitigation_strategies: Vec::new(),
            similar_case_outcomes: HashMap::new(),
            judge_ruling_patterns: HashMap::new(),
        }
    }

    pub fn data_points(&self) -> usize {
        self.legal_theories.len()
            + self.supporting_precedents.len()
            + self.opposing_precedents.len()
    }

    /// Average relevance across all precedents, 0.0 when there are none
    pub fn average_relevance(&self) -> f64 {
        let all: Vec<&PrecedentAnalysis> = self
            .supporting_precedents
            .iter()
            .chain(self.opposing_precedents.iter())
            .collect();
        if all.is_empty() {
            return 0.0;
        }
        all.iter().map(|p| p.relevance_score).sum::<f64>() / all.len() as f64
    }
}

// =============================================================================
// Combined response & quality metrics
// =============================================================================

/// Multi-dimensional context for a case, with quality metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextResponse {
    pub query_id: String,
    pub case_id: String,
    pub case_name: String,
    #[serde(default)]
    pub who: Option<WhoContext>,
    #[serde(default)]
    pub what: Option<WhatContext>,
    #[serde(rename = "where", default)]
    pub where_: Option<WhereContext>,
    #[serde(default)]
    pub when: Option<WhenContext>,
    #[serde(default)]
    pub why: Option<WhyContext>,
    /// Average dimension score times completeness ratio, [0, 1]
    pub context_score: f64,
    pub is_complete: bool,
    pub cached: bool,
    pub execution_time_ms: u64,
    pub timestamp: DateTime<Utc>,
}

impl ContextResponse {
    pub fn new(case_id: impl Into<String>, case_name: impl Into<String>) -> Self {
        ContextResponse {
            query_id: Uuid::new_v4().to_string(),
            case_id: case_id.into(),
            case_name: case_name.into(),
            who: None,
            what: None,
            where_: None,
            when: None,
            why: None,
            context_score: 0.0,
            is_complete: false,
            cached: false,
            execution_time_ms: 0,
            timestamp: Utc::now(),
        }
    }
}

/// Quality metrics for a single dimension
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimensionQualityMetrics {
    pub dimension_name: String,
    pub completeness_score: f64,
    pub data_points: usize,
    pub confidence_avg: f64,
    /// True when the completeness score meets the 0.85 threshold
    pub is_sufficient: bool,
}

// =============================================================================
// Tests
// =============================================================================
