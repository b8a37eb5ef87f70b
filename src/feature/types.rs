//! Resolved features and the metadata that describes them

use std::fmt;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::feature::identifier::VersionedIdentifier;

/// A concrete feature obtained from a factory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feature {
    versioned_id: VersionedIdentifier,
    url: Url,
    feature_type: String,
    label: Option<String>,
}

impl Feature {
    pub fn new(versioned_id: VersionedIdentifier, url: Url, feature_type: &str) -> Self {
        Self {
            versioned_id,
            url,
            feature_type: feature_type.to_string(),
            label: None,
        }
    }

    pub fn with_label(mut self, label: Option<String>) -> Self {
        self.label = label;
        self
    }

    pub fn versioned_id(&self) -> &VersionedIdentifier {
        &self.versioned_id
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn feature_type(&self) -> &str {
        &self.feature_type
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.label {
            Some(label) => f.write_str(label),
            None => write!(f, "{}", self.versioned_id),
        }
    }
}

/// A category defined by a site
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Metadata published next to a feature, read by the manifest factory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureManifest {
    pub id: String,
    pub version: String,
    #[serde(default)]
    pub label: Option<String>,
}

/// Serializable view of a resolved feature
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureSummary {
    pub id: String,
    pub version: String,
    pub url: String,
    pub feature_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl From<&Feature> for FeatureSummary {
    fn from(feature: &Feature) -> Self {
        Self {
            id: feature.versioned_id.identifier().to_string(),
            version: feature.versioned_id.version().to_string(),
            url: feature.url.to_string(),
            feature_type: feature.feature_type.clone(),
            label: feature.label.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feature(label: Option<&str>) -> Feature {
        Feature::new(
            VersionedIdentifier::new("com.example.foo", "1.0.0").unwrap(),
            Url::parse("file:///site/features/foo.json").unwrap(),
            "packaged",
        )
        .with_label(label.map(str::to_string))
    }

    #[test]
    fn display_prefers_label() {
        assert_eq!(feature(Some("Foo Tools")).to_string(), "Foo Tools");
        assert_eq!(feature(None).to_string(), "com.example.foo_1.0.0");
    }

    #[test]
    fn summary_serializes_camel_case_without_empty_label() {
        let summary = FeatureSummary::from(&feature(None));

        assert_eq!(
            serde_json::to_value(&summary).unwrap(),
            serde_json::json!({
                "id": "com.example.foo",
                "version": "1.0.0",
                "url": "file:///site/features/foo.json",
                "featureType": "packaged"
            })
        );
    }
}
