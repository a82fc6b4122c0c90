//! Context data model

pub mod dimensions;
pub mod scope;

pub use dimensions::{
    Attorney, Citation, CauseOfAction, ContextResponse, Deadline, DimensionQualityMetrics,
    Judge, LegalTheory, LocalRule, Party, PrecedentAnalysis, TimelineEvent, WhatContext,
    WhenContext, WhereContext, WhoContext, WhyContext, Witness, VALID_PARTY_ROLES,
};
pub use scope::{resolve_dimensions, Dimension, Scope};
