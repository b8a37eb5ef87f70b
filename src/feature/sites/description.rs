//! JSON site descriptions
//!
//! ```json
//! {
//!   "url": "https://updates.example.com/",
//!   "defaultFeatureType": "packaged",
//!   "categories": [{ "name": "tools", "label": "Tools" }],
//!   "features": [
//!     {
//!       "url": "features/foo_1.3.0.json",
//!       "id": "com.example.foo",
//!       "version": "1.3.0",
//!       "categories": ["tools"],
//!       "options": { "matchRule": "compatible" }
//!     }
//!   ]
//! }
//! ```
//!
//! Options written by older tools carry a numeric `match` code instead of
//! `matchRule`. The code is translated when the description is loaded.

use std::path::Path;

use reqwest::Url;
use serde::Deserialize;

use crate::feature::error::SiteError;
use crate::feature::options::{ReferenceOptions, SearchScope};
use crate::feature::rule::MatchRule;
use crate::feature::site::DEFAULT_FEATURE_TYPE;
use crate::feature::sites::ConfiguredFeature;
use crate::feature::types::Category;

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SiteDescription {
    /// Site location; defaults to the directory holding the description
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_feature_type")]
    pub default_feature_type: String,
    /// An unconfigured site offers no candidate pool
    #[serde(default = "default_configured")]
    pub configured: bool,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub features: Vec<FeatureEntry>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeatureEntry {
    pub url: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default, rename = "type")]
    pub feature_type: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub options: Option<OptionsEntry>,
    #[serde(default)]
    pub disabled: bool,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct OptionsEntry {
    pub match_rule: Option<String>,
    /// Numeric rule code used before `matchRule` existed
    #[serde(rename = "match")]
    pub legacy_match: Option<i64>,
    pub search_location: SearchLocation,
    pub optional: bool,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum SearchLocation {
    #[default]
    Root,
    #[serde(rename = "self")]
    SelfOnly,
}

fn default_feature_type() -> String {
    DEFAULT_FEATURE_TYPE.to_string()
}

fn default_configured() -> bool {
    true
}

impl SiteDescription {
    pub fn from_json(json: &str) -> Result<Self, SiteError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a description file, defaulting the site URL to its directory
    pub fn load(path: &Path) -> Result<Self, SiteError> {
        let mut description = Self::from_json(&std::fs::read_to_string(path)?)?;
        if description.url.is_none() {
            let dir = std::fs::canonicalize(path)?
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default();
            let url = Url::from_directory_path(&dir).map_err(|_| SiteError::InvalidUrl {
                url: dir.display().to_string(),
                reason: "not an absolute path".to_string(),
            })?;
            description.url = Some(url.to_string());
        }
        Ok(description)
    }

    pub fn site_url(&self) -> Result<Url, SiteError> {
        let raw = self.url.as_deref().unwrap_or_default();
        Url::parse(raw).map_err(|e| SiteError::InvalidUrl {
            url: raw.to_string(),
            reason: e.to_string(),
        })
    }

    /// Features with URLs resolved against the site URL and options migrated
    pub fn configured_features(&self) -> Result<Vec<ConfiguredFeature>, SiteError> {
        let base = self.site_url()?;
        self.features
            .iter()
            .map(|entry| entry.to_configured(&base))
            .collect()
    }
}

impl FeatureEntry {
    fn to_configured(&self, base: &Url) -> Result<ConfiguredFeature, SiteError> {
        let url = base.join(&self.url).map_err(|e| SiteError::InvalidUrl {
            url: self.url.clone(),
            reason: e.to_string(),
        })?;

        Ok(ConfiguredFeature {
            url,
            feature_type: self.feature_type.clone(),
            identifier: self.id.clone(),
            version: self.version.clone(),
            category_names: self.categories.clone(),
            options: self.options.as_ref().map(OptionsEntry::migrate).transpose()?,
            enabled: !self.disabled,
        })
    }
}

impl OptionsEntry {
    /// `matchRule` wins; `match` is only consulted when it is absent
    pub fn migrate(&self) -> Result<ReferenceOptions, SiteError> {
        let match_rule = match (&self.match_rule, self.legacy_match) {
            (Some(rule), _) => rule.parse::<MatchRule>()?,
            (None, Some(code)) => MatchRule::from_code(code)?,
            (None, None) => MatchRule::default(),
        };

        Ok(ReferenceOptions {
            match_rule,
            search_scope: match self.search_location {
                SearchLocation::Root => SearchScope::Root,
                SearchLocation::SelfOnly => SearchScope::SelfOnly,
            },
            optional: self.optional,
            name: self.name.clone(),
        })
    }
}
