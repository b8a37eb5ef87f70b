//! Options attached to a feature reference

use serde::{Deserialize, Serialize};

use crate::feature::rule::MatchRule;

/// Where an included feature is searched for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SearchScope {
    /// The root site of the installation
    #[default]
    Root,
    /// The site that declares the reference
    #[serde(rename = "self")]
    SelfOnly,
}

/// Matching options for a reference. A reference without options uses
/// [`ReferenceOptions::default`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReferenceOptions {
    pub match_rule: MatchRule,
    pub search_scope: SearchScope,
    pub optional: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ReferenceOptions {
    pub fn with_rule(match_rule: MatchRule) -> Self {
        Self {
            match_rule,
            ..Self::default()
        }
    }
}
