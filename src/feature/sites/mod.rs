//! Site implementations providing candidate pools

pub mod description;
pub mod static_site;
pub mod store;

pub use description::SiteDescription;
pub use static_site::StaticSite;
pub use store::SiteStore;

use std::sync::Arc;

use reqwest::Url;

use crate::feature::options::ReferenceOptions;
use crate::feature::reference::FeatureReference;
use crate::feature::site::Site;

/// A feature as listed in a site's configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfiguredFeature {
    pub url: Url,
    pub feature_type: Option<String>,
    pub identifier: Option<String>,
    pub version: Option<String>,
    pub category_names: Vec<String>,
    pub options: Option<ReferenceOptions>,
    pub enabled: bool,
}

impl ConfiguredFeature {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            feature_type: None,
            identifier: None,
            version: None,
            category_names: Vec::new(),
            options: None,
            enabled: true,
        }
    }

    /// Build a reference to this feature bound to `site`
    pub fn to_reference(&self, site: Arc<dyn Site>) -> FeatureReference {
        let reference = FeatureReference::new(site, self.url.clone())
            .with_type(self.feature_type.clone())
            .with_category_names(self.category_names.clone())
            .with_options(self.options.clone())
            .with_disabled(!self.enabled);

        match (&self.identifier, &self.version) {
            (Some(identifier), Some(version)) => {
                reference.with_declared_version(identifier, version)
            }
            _ => reference,
        }
    }
}
