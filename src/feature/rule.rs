//! Match rules constraining which candidate versions satisfy a reference

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::feature::error::ResolutionError;
use crate::feature::identifier::VersionedIdentifier;

/// How a nominal version constrains acceptable candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchRule {
    /// Exactly the nominal version
    #[default]
    Perfect,
    /// Same major version, not older than nominal
    Compatible,
    /// Same major and minor version, not older than nominal
    Equivalent,
    /// Any version not older than nominal
    GreaterOrEqual,
}

impl MatchRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchRule::Perfect => "perfect",
            MatchRule::Compatible => "compatible",
            MatchRule::Equivalent => "equivalent",
            MatchRule::GreaterOrEqual => "greaterOrEqual",
        }
    }

    /// Translate a numeric rule code as written by older site descriptions.
    ///
    /// `0` means "no rule" and maps to the default.
    pub fn from_code(code: i64) -> Result<Self, ResolutionError> {
        match code {
            0 | 1 => Ok(MatchRule::Perfect),
            2 => Ok(MatchRule::Equivalent),
            3 => Ok(MatchRule::Compatible),
            4 => Ok(MatchRule::GreaterOrEqual),
            other => {
                warn!("Unknown matching rule: {}", other);
                Err(ResolutionError::UnknownMatchRule(other.to_string()))
            }
        }
    }

    /// Whether `candidate` satisfies this rule against `nominal`.
    ///
    /// Identifiers must be equal before any version is compared.
    pub fn matches(&self, nominal: &VersionedIdentifier, candidate: &VersionedIdentifier) -> bool {
        if !candidate.same_identifier(nominal) {
            return false;
        }

        let (candidate, nominal) = (candidate.version(), nominal.version());
        match self {
            MatchRule::Perfect => candidate.is_perfect(nominal),
            MatchRule::Compatible => candidate.is_compatible_with(nominal),
            MatchRule::Equivalent => candidate.is_equivalent_to(nominal),
            MatchRule::GreaterOrEqual => candidate.is_greater_or_equal_to(nominal),
        }
    }
}

impl FromStr for MatchRule {
    type Err = ResolutionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "perfect" => Ok(MatchRule::Perfect),
            "compatible" => Ok(MatchRule::Compatible),
            "equivalent" => Ok(MatchRule::Equivalent),
            "greaterorequal" | "greater-or-equal" | "greater_or_equal" => {
                Ok(MatchRule::GreaterOrEqual)
            }
            _ => {
                warn!("Unknown matching rule: {}", s);
                Err(ResolutionError::UnknownMatchRule(s.to_string()))
            }
        }
    }
}

impl fmt::Display for MatchRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
