//! Site trait exposing the candidate pool of configured features

#[cfg(test)]
use mockall::automock;

use reqwest::Url;

use crate::feature::error::SiteError;
use crate::feature::reference::FeatureReference;
use crate::feature::types::Category;

/// Packaging type used when a site does not name one
pub const DEFAULT_FEATURE_TYPE: &str = "packaged";

/// A location hosting features
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait Site: Send + Sync {
    /// Location of the site
    fn url(&self) -> Url;

    /// Type used for references that do not declare one
    fn default_feature_type(&self) -> String;

    /// Look up a category defined by this site
    fn category(&self, name: &str) -> Option<Category>;

    /// A reference to `url` on this site. Features the site lists keep their
    /// declared metadata; other URLs get a bare reference.
    fn reference_to(&self, url: &Url) -> Result<FeatureReference, SiteError>;

    /// Returns the currently configured candidate references
    ///
    /// # Returns
    /// * `Ok(Some(refs))` - Enabled references in a stable order (may be empty)
    /// * `Ok(None)` - The site has no configuration to search
    /// * `Err(SiteError)` - The configuration could not be read
    async fn configured_candidates(&self) -> Result<Option<Vec<FeatureReference>>, SiteError>;
}
