//! Feature factories keyed by packaging type

use std::collections::HashMap;
use std::sync::Arc;

use reqwest::Url;
use tracing::debug;

use crate::feature::error::ResolutionError;
use crate::feature::factories::ManifestFeatureFactory;
use crate::feature::site::{DEFAULT_FEATURE_TYPE, Site};
use crate::feature::types::Feature;

/// Trait for building a concrete feature from its location
#[async_trait::async_trait]
pub trait FeatureFactory: Send + Sync {
    /// Creates the feature found at `url` on `site`
    ///
    /// # Arguments
    /// * `feature_type` - The type the factory was selected for
    /// * `url` - Location of the feature
    /// * `site` - Site the feature belongs to
    ///
    /// # Returns
    /// * `Ok(Feature)` - The feature with its authoritative identifier
    /// * `Err(ResolutionError::Unresolvable)` - If the feature cannot be read
    async fn create_feature(
        &self,
        feature_type: &str,
        url: &Url,
        site: &dyn Site,
    ) -> Result<Feature, ResolutionError>;
}

/// Maps packaging types to the factory that builds them
#[derive(Clone, Default)]
pub struct FeatureTypeRegistry {
    factories: HashMap<String, Arc<dyn FeatureFactory>>,
}

impl FeatureTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the manifest factory bound to the default packaging type
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(DEFAULT_FEATURE_TYPE, Arc::new(ManifestFeatureFactory::default()));
        registry
    }

    pub fn register(&mut self, feature_type: &str, factory: Arc<dyn FeatureFactory>) {
        debug!("Registering feature factory for type {}", feature_type);
        self.factories.insert(feature_type.to_string(), factory);
    }

    pub fn factory(&self, feature_type: &str) -> Result<&Arc<dyn FeatureFactory>, ResolutionError> {
        self.factories
            .get(feature_type)
            .ok_or_else(|| ResolutionError::UnknownType(feature_type.to_string()))
    }

    pub async fn create(
        &self,
        feature_type: &str,
        url: &Url,
        site: &dyn Site,
    ) -> Result<Feature, ResolutionError> {
        self.factory(feature_type)?
            .create_feature(feature_type, url, site)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::identifier::VersionedIdentifier;
    use crate::feature::site::MockSite;

    struct FixedFactory;

    #[async_trait::async_trait]
    impl FeatureFactory for FixedFactory {
        async fn create_feature(
            &self,
            feature_type: &str,
            url: &Url,
            _site: &dyn Site,
        ) -> Result<Feature, ResolutionError> {
            Ok(Feature::new(
                VersionedIdentifier::new("com.example.foo", "1.0.0").unwrap(),
                url.clone(),
                feature_type,
            ))
        }
    }

    #[tokio::test]
    async fn create_uses_registered_factory() {
        let mut registry = FeatureTypeRegistry::new();
        registry.register("binary", Arc::new(FixedFactory));
        let url = Url::parse("file:///site/features/foo.json").unwrap();

        let feature = registry.create("binary", &url, &MockSite::new()).await.unwrap();

        assert_eq!(feature.feature_type(), "binary");
        assert_eq!(feature.url(), &url);
    }

    #[tokio::test]
    async fn create_fails_for_unregistered_type() {
        let registry = FeatureTypeRegistry::new();
        let url = Url::parse("file:///site/features/foo.json").unwrap();

        let result = registry.create("binary", &url, &MockSite::new()).await;

        assert_eq!(result, Err(ResolutionError::UnknownType("binary".to_string())));
    }

    #[test]
    fn with_defaults_registers_packaged_type() {
        let registry = FeatureTypeRegistry::with_defaults();
        assert!(registry.factory(DEFAULT_FEATURE_TYPE).is_ok());
    }
}
