//! Context scopes and dimension names
//!
//! A scope selects which of the five dimensions get built for a request.
//! Callers may also name dimensions explicitly, which overrides the scope.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

// =============================================================================
// Dimension
// =============================================================================

/// One of the five context dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Dimension {
    /// Parties, judges, attorneys, witnesses
    Who,
    /// Legal issues, causes of action, citations
    What,
    /// Jurisdiction, court, venue
    Where,
    /// Timeline, deadlines, case age
    When,
    /// Legal theories, precedents, argument analysis
    Why,
}

impl Dimension {
    /// All dimensions, in canonical order
    pub const ALL: [Dimension; 5] = [
        Dimension::Who,
        Dimension::What,
        Dimension::Where,
        Dimension::When,
        Dimension::Why,
    ];

    /// Canonical uppercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Who => "WHO",
            Dimension::What => "WHAT",
            Dimension::Where => "WHERE",
            Dimension::When => "WHEN",
            Dimension::Why => "WHY",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dimension {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "WHO" => Ok(Dimension::Who),
            "WHAT" => Ok(Dimension::What),
            "WHERE" => Ok(Dimension::Where),
            "WHEN" => Ok(Dimension::When),
            "WHY" => Ok(Dimension::Why),
            other => Err(Error::InvalidDimension(other.to_string())),
        }
    }
}

// =============================================================================
// Scope
// =============================================================================

/// Context scope - how much of the case picture to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// WHO + WHERE: basic parties and jurisdiction
    Minimal,
    /// WHO + WHAT + WHERE + WHEN: adds legal issues and timeline
    Standard,
    /// All five dimensions including WHY
    #[default]
    Comprehensive,
}

impl Scope {
    /// Dimensions built for this scope
    pub fn dimensions(&self) -> &'static [Dimension] {
        match self {
            Scope::Minimal => &[Dimension::Who, Dimension::Where],
            Scope::Standard => &[
                Dimension::Who,
                Dimension::What,
                Dimension::Where,
                Dimension::When,
            ],
            Scope::Comprehensive => &Dimension::ALL,
        }
    }

    /// Canonical lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Minimal => "minimal",
            Scope::Standard => "standard",
            Scope::Comprehensive => "comprehensive",
        }
    }

    /// All scopes (used for whole-case cache invalidation)
    pub const ALL: [Scope; 3] = [Scope::Minimal, Scope::Standard, Scope::Comprehensive];
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "minimal" => Ok(Scope::Minimal),
            "standard" => Ok(Scope::Standard),
            "comprehensive" => Ok(Scope::Comprehensive),
            other => Err(Error::InvalidScope(other.to_string())),
        }
    }
}

/// Resolve the dimensions to build from a scope and an optional explicit list.
///
/// An explicit list overrides the scope. Invalid names are rejected rather
/// than silently skipped.
pub fn resolve_dimensions(scope: Scope, explicit: Option<&[String]>) -> Result<Vec<Dimension>> {
    match explicit {
        Some(names) if !names.is_empty() => {
            let mut dims = Vec::with_capacity(names.len());
            for name in names {
                let dim: Dimension = name.parse()?;
                if !dims.contains(&dim) {
                    dims.push(dim);
                }
            }
            Ok(dims)
        }
        _ => Ok(scope.dimensions().to_vec()),
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
    fn test_scope_dimension_mapping() {
        assert_eq!(
            Scope::Minimal.dimensions(),
            &[Dimension::Who, Dimension::Where]
        );
        assert_eq!(Scope::Standard.dimensions().len(), 4);
        assert!(!Scope::Standard.dimensions().contains(&Dimension::Why));
        assert_eq!(Scope::Comprehensive.dimensions(), &Dimension::ALL);
    }

    #[test]
    fn test_scope_parsing() {
        assert_eq!("minimal".parse::<Scope>().unwrap(), Scope::Minimal);
        assert_eq!("STANDARD".parse::<Scope>().unwrap(), Scope::Standard);
        assert_eq!(
            "comprehensive".parse::<Scope>().unwrap(),
            Scope::Comprehensive
        );
        assert_matches!("everything".parse::<Scope>(), Err(Error::InvalidScope(_)));
    }

    #[test]
    fn test_dimension_parsing() {
        assert_eq!("WHO".parse::<Dimension>().unwrap(), Dimension::Who);
        assert_eq!("who".parse::<Dimension>().unwrap(), Dimension::Who);
        assert_eq!("Where".parse::<Dimension>().unwrap(), Dimension::Where);
        assert_matches!(
            "HOW".parse::<Dimension>(),
            Err(Error::InvalidDimension(_))
        );
    }

    #[test]
    fn test_dimension_display_roundtrip() {
        for dim in Dimension::ALL {
            assert_eq!(dim.to_string().parse::<Dimension>().unwrap(), dim);
        }
    }

    #[test]
    fn test_resolve_dimensions_from_scope() {
        let dims = resolve_dimensions(Scope::Minimal, None).unwrap();
        assert_eq!(dims, vec![Dimension::Who, Dimension::Where]);
    }

    #[test]
    fn test_resolve_dimensions_explicit_override() {
        let explicit = vec!["WHO".to_string(), "WHEN".to_string()];
        let dims = resolve_dimensions(Scope::Comprehensive, Some(&explicit)).unwrap();
        assert_eq!(dims, vec![Dimension::Who, Dimension::When]);
    }

    #[test]
    fn test_resolve_dimensions_deduplicates() {
        let explicit = vec!["WHO".to_string(), "who".to_string()];
        let dims = resolve_dimensions(Scope::Standard, Some(&explicit)).unwrap();
        assert_eq!(dims, vec![Dimension::Who]);
    }

    #[test]
    fn test_resolve_dimensions_rejects_invalid() {
        let explicit = vec!["WHO".to_string(), "WHETHER".to_string()];
        assert_matches!(
            resolve_dimensions(Scope::Standard, Some(&explicit)),
            Err(Error::InvalidDimension(_))
        );
    }

    #[test]
    fn test_resolve_dimensions_empty_explicit_falls_back_to_scope() {
        let explicit: Vec<String> = vec![];
        let dims = resolve_dimensions(Scope::Standard, Some(&explicit)).unwrap();
        assert_eq!(dims.len(), 4);
    }

    #[test]
    fn test_scope_serde() {
        let json = serde_json::to_string(&Scope::Comprehensive).unwrap();
        assert_eq!(json, "\"comprehensive\"");
        let parsed: Scope = serde_json::from_str("\"minimal\"").unwrap();
        assert_eq!(parsed, Scope::Minimal);
    }

    #[test]
    fn test_dimension_serde() {
        let json = serde_json::to_string(&Dimension::Why).unwrap();
        assert_eq!(json, "\"WHY\"");
        let parsed: Dimension = serde_json::from_str("\"WHEN\"").unwrap();
        assert_eq!(parsed, Dimension::When);
    }
}
