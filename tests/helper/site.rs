//! Site and factory test utilities

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use reqwest::Url;

use feature_resolver::feature::error::ResolutionError;
use feature_resolver::feature::factory::{FeatureFactory, FeatureTypeRegistry};
use feature_resolver::feature::identifier::VersionedIdentifier;
use feature_resolver::feature::options::ReferenceOptions;
use feature_resolver::feature::reference::FeatureReference;
use feature_resolver::feature::resolver::ReferenceResolver;
use feature_resolver::feature::rule::MatchRule;
use feature_resolver::feature::site::Site;
use feature_resolver::feature::sites::{SiteDescription, StaticSite};
use feature_resolver::feature::types::Feature;

pub const FOO: &str = "com.example.foo";

const SITE_URL: &str = "https://updates.example.com/";

/// Mock factory serving features from a URL table
#[derive(Default)]
pub struct MockFeatureFactory {
    features: HashMap<String, VersionedIdentifier>,
    calls: AtomicUsize,
}

impl MockFeatureFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_feature(mut self, url: &Url, identifier: &str, version: &str) -> Self {
        self.features.insert(
            url.to_string(),
            VersionedIdentifier::new(identifier, version).unwrap(),
        );
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeatureFactory for MockFeatureFactory {
    async fn create_feature(
        &self,
        feature_type: &str,
        url: &Url,
        _site: &dyn Site,
    ) -> Result<Feature, ResolutionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.features.get(url.as_str()) {
            Some(id) => Ok(Feature::new(id.clone(), url.clone(), feature_type)),
            None => Err(ResolutionError::unresolvable(url, "not found")),
        }
    }
}

/// Create a resolver whose default packaging type is served by `factory`
pub fn create_test_resolver(factory: Arc<MockFeatureFactory>) -> ReferenceResolver {
    let mut registry = FeatureTypeRegistry::new();
    registry.register("packaged", factory);
    ReferenceResolver::new(Arc::new(registry))
}

/// URL of the `foo` feature at `version` on the test site
pub fn feature_url(version: &str) -> Url {
    Url::parse(SITE_URL)
        .unwrap()
        .join(&format!("features/foo_{}.json", version))
        .unwrap()
}

/// Create a test site whose pool lists `com.example.foo` at `versions`, in
/// order, each with a declared identifier
pub fn create_test_site(versions: &[&str], configured: bool) -> Arc<StaticSite> {
    let features: Vec<_> = versions
        .iter()
        .map(|version| {
            serde_json::json!({
                "url": format!("features/foo_{}.json", version),
                "id": FOO,
                "version": version,
            })
        })
        .collect();

    let description = serde_json::json!({
        "url": SITE_URL,
        "configured": configured,
        "features": features,
    });

    StaticSite::from_description(&SiteDescription::from_json(&description.to_string()).unwrap())
        .unwrap()
}

/// A reference to `com.example.foo` at `version` on `site`
pub fn reference(site: Arc<StaticSite>, version: &str, rule: MatchRule) -> FeatureReference {
    FeatureReference::new(site, feature_url(version))
        .with_declared_version(FOO, version)
        .with_options(Some(ReferenceOptions::with_rule(rule)))
}
