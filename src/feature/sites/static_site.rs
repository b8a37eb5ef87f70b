//! In-memory site built from a site description

use std::path::Path;
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use reqwest::Url;
use tracing::debug;

use crate::feature::error::SiteError;
use crate::feature::reference::FeatureReference;
use crate::feature::site::Site;
use crate::feature::sites::{ConfiguredFeature, SiteDescription};
use crate::feature::types::Category;

/// A site whose features are fixed when it is loaded
pub struct StaticSite {
    this: Weak<StaticSite>,
    url: Url,
    default_feature_type: String,
    configured: bool,
    categories: IndexMap<String, Category>,
    features: Vec<ConfiguredFeature>,
}

impl StaticSite {
    pub fn from_description(description: &SiteDescription) -> Result<Arc<Self>, SiteError> {
        let url = description.site_url()?;
        let features = description.configured_features()?;
        let categories = description
            .categories
            .iter()
            .map(|c| (c.name.clone(), c.clone()))
            .collect();

        debug!("Loaded site {} with {} features", url, features.len());

        Ok(Arc::new_cyclic(|this| Self {
            this: this.clone(),
            url,
            default_feature_type: description.default_feature_type.clone(),
            configured: description.configured,
            categories,
            features,
        }))
    }

    pub fn load(path: &Path) -> Result<Arc<Self>, SiteError> {
        Self::from_description(&SiteDescription::load(path)?)
    }

    /// Every listed feature, enabled or not, in description order
    pub fn features(&self) -> &[ConfiguredFeature] {
        &self.features
    }

    pub fn categories(&self) -> impl Iterator<Item = &Category> {
        self.categories.values()
    }

    pub fn is_configured(&self) -> bool {
        self.configured
    }

    /// Resolve `raw` against the site URL
    pub fn join(&self, raw: &str) -> Result<Url, SiteError> {
        self.url.join(raw).map_err(|e| SiteError::InvalidUrl {
            url: raw.to_string(),
            reason: e.to_string(),
        })
    }

    fn handle(&self) -> Result<Arc<dyn Site>, SiteError> {
        let site: Arc<dyn Site> = self.this.upgrade().ok_or(SiteError::Gone)?;
        Ok(site)
    }
}

#[async_trait::async_trait]
impl Site for StaticSite {
    fn url(&self) -> Url {
        self.url.clone()
    }

    fn default_feature_type(&self) -> String {
        self.default_feature_type.clone()
    }

    fn category(&self, name: &str) -> Option<Category> {
        self.categories.get(name).cloned()
    }

    fn reference_to(&self, url: &Url) -> Result<FeatureReference, SiteError> {
        let site = self.handle()?;
        Ok(match self.features.iter().find(|f| &f.url == url) {
            Some(feature) => feature.to_reference(site),
            None => FeatureReference::new(site, url.clone()),
        })
    }

    async fn configured_candidates(&self) -> Result<Option<Vec<FeatureReference>>, SiteError> {
        if !self.configured {
            return Ok(None);
        }

        let site = self.handle()?;
        Ok(Some(
            self.features
                .iter()
                .filter(|f| f.enabled)
                .map(|f| f.to_reference(Arc::clone(&site)))
                .collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site(json: &str) -> Arc<StaticSite> {
        StaticSite::from_description(&SiteDescription::from_json(json).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn configured_candidates_keep_order_and_skip_disabled() {
        let site = site(
            r#"{
                "url": "https://updates.example.com/",
                "features": [
                    {"url": "b.json", "id": "com.example.foo", "version": "2.0.0"},
                    {"url": "c.json", "disabled": true},
                    {"url": "a.json", "id": "com.example.foo", "version": "1.0.0"}
                ]
            }"#,
        );

        let candidates = site.configured_candidates().await.unwrap().unwrap();
        let urls: Vec<&str> = candidates.iter().map(|c| c.url().as_str()).collect();

        assert_eq!(
            urls,
            vec![
                "https://updates.example.com/b.json",
                "https://updates.example.com/a.json"
            ]
        );
        assert_eq!(
            candidates[0].declared_id().map(|id| id.to_string()),
            Some("com.example.foo_2.0.0".to_string())
        );
    }

    #[tokio::test]
    async fn unconfigured_site_has_no_pool() {
        let site = site(r#"{"url": "https://updates.example.com/", "configured": false}"#);
        assert!(site.configured_candidates().await.unwrap().is_none());
    }

    #[test]
    fn category_lookup_uses_description() {
        let site = site(
            r#"{
                "url": "https://updates.example.com/",
                "categories": [{"name": "tools", "label": "Tools"}]
            }"#,
        );

        assert_eq!(site.category("tools").map(|c| c.label), Some("Tools".to_string()));
        assert_eq!(site.category("other"), None);
    }

    #[test]
    fn reference_to_listed_feature_keeps_metadata() {
        let site = site(
            r#"{
                "url": "https://updates.example.com/",
                "features": [{
                    "url": "a.json",
                    "type": "binary",
                    "categories": ["tools"],
                    "options": {"match": 3},
                    "disabled": true
                }]
            }"#,
        );

        let url = site.join("a.json").unwrap();
        let reference = site.reference_to(&url).unwrap();

        assert_eq!(reference.feature_type(), Some("binary"));
        assert_eq!(
            reference.match_rule(),
            crate::feature::rule::MatchRule::Compatible
        );
        assert_eq!(reference.category_names(), ["tools".to_string()]);
        assert!(reference.is_disabled());
    }

    #[test]
    fn reference_to_unlisted_url_is_bare() {
        let site = site(r#"{"url": "https://updates.example.com/"}"#);

        let url = site.join("other.json").unwrap();
        let reference = site.reference_to(&url).unwrap();

        assert_eq!(reference.url(), &url);
        assert_eq!(reference.feature_type(), None);
        assert!(reference.options().is_none());
        assert!(!reference.is_disabled());
    }
}
