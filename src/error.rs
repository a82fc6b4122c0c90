//! Error types for the Context Engine Service

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the Context Engine Service
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// GraphRAG connection error
    #[error("GraphRAG connection error: {0}")]
    GraphConnection(#[source] reqwest::Error),

    /// GraphRAG query error
    #[error("GraphRAG query error: {0}")]
    GraphQuery(String),

    /// GraphRAG response parse error
    #[error("Failed to parse GraphRAG response: {0}")]
    GraphResponseParse(String),

    /// Case store connection error
    #[error("Case store connection error: {0}")]
    StoreConnection(#[source] reqwest::Error),

    /// Case store query error
    #[error("Case store query error: {0}")]
    StoreQuery(String),

    /// Case store response parse error
    #[error("Failed to parse case store response: {0}")]
    StoreResponseParse(String),

    /// Missing case identifier on a case-scoped operation
    #[error("case_id is required for case-scoped operation: {operation}")]
    MissingCaseId { operation: String },

    /// Invalid context scope
    #[error("Invalid scope: {0}. Valid scopes: minimal, standard, comprehensive")]
    InvalidScope(String),

    /// Invalid dimension name
    #[error("Invalid dimension: {0}. Valid dimensions: WHO, WHAT, WHERE, WHEN, WHY")]
    InvalidDimension(String),

    /// Invalid party role
    #[error("Invalid party role: {0}")]
    InvalidPartyRole(String),

    /// Dimension analysis failed
    #[error("Analysis of {dimension} dimension failed for case {case_id}: {reason}")]
    AnalysisFailed {
        dimension: String,
        case_id: String,
        reason: String,
    },

    /// Cache backend error
    #[error("Cache backend error: {0}")]
    CacheBackend(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Malformed request body
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True when the error is a client-side problem (maps to HTTP 400)
    pub fn is_bad_request(&self) -> bool {
        matches!(
            self,
            Error::MissingCaseId { .. }
                | Error::InvalidScope(_)
                | Error::InvalidDimension(_)
                | Error::InvalidPartyRole(_)
                | Error::BadRequest(_)
        )
    }
}
