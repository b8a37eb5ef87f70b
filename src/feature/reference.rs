//! Symbolic references to features and their resolution slots

use std::fmt;
use std::sync::{Arc, OnceLock};

use reqwest::Url;
use tokio::sync::OnceCell;
use tracing::warn;

use crate::feature::identifier::VersionedIdentifier;
use crate::feature::options::{ReferenceOptions, SearchScope};
use crate::feature::rule::MatchRule;
use crate::feature::site::Site;
use crate::feature::types::{Category, Feature};

/// Observable state of the best-match slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BestMatchState {
    Unresolved,
    /// The reference resolved to its own exact feature
    ResolvedToSelf,
    /// A candidate from the site's pool won
    ResolvedToCandidate,
}

/// A pointer to a feature on a site, prior to resolution.
///
/// All fields are fixed at construction. The two slots are set at most once by
/// [`ReferenceResolver`](crate::feature::resolver::ReferenceResolver) and never
/// cleared.
pub struct FeatureReference {
    site: Arc<dyn Site>,
    url: Url,
    feature_type: Option<String>,
    declared_id: Option<VersionedIdentifier>,
    options: Option<ReferenceOptions>,
    category_names: Vec<String>,
    disabled: bool,
    exact: OnceCell<Arc<Feature>>,
    best: OnceCell<Arc<Feature>>,
    categories: OnceLock<Vec<Category>>,
}

impl FeatureReference {
    pub fn new(site: Arc<dyn Site>, url: Url) -> Self {
        Self {
            site,
            url,
            feature_type: None,
            declared_id: None,
            options: None,
            category_names: Vec::new(),
            disabled: false,
            exact: OnceCell::new(),
            best: OnceCell::new(),
            categories: OnceLock::new(),
        }
    }

    /// A fresh reference to the same feature as `other`, with empty slots and
    /// no options
    pub fn derived_from(other: &FeatureReference) -> Self {
        Self::new(Arc::clone(&other.site), other.url.clone())
            .with_type(other.feature_type.clone())
            .with_declared_id(other.declared_id.clone())
            .with_category_names(other.category_names.clone())
    }

    pub fn with_type(mut self, feature_type: Option<String>) -> Self {
        self.feature_type = feature_type;
        self
    }

    pub fn with_declared_id(mut self, declared_id: Option<VersionedIdentifier>) -> Self {
        self.declared_id = declared_id;
        self
    }

    /// Declare the identifier from raw strings. An unparseable pair is
    /// reported and left undeclared, so the feature's own identifier is used.
    pub fn with_declared_version(self, identifier: &str, version: &str) -> Self {
        match VersionedIdentifier::new(identifier, version) {
            Ok(id) => self.with_declared_id(Some(id)),
            Err(e) => {
                warn!(
                    "Unable to create versioned identifier {}:{}: {}",
                    identifier, version, e
                );
                self
            }
        }
    }

    pub fn with_options(mut self, options: Option<ReferenceOptions>) -> Self {
        self.options = options;
        self
    }

    pub fn with_category_names(mut self, names: Vec<String>) -> Self {
        self.category_names = names;
        self
    }

    pub fn with_disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    pub fn site(&self) -> &Arc<dyn Site> {
        &self.site
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Declared packaging type, if any non-empty one was given
    pub fn feature_type(&self) -> Option<&str> {
        self.feature_type.as_deref().filter(|t| !t.is_empty())
    }

    pub fn declared_id(&self) -> Option<&VersionedIdentifier> {
        self.declared_id.as_ref()
    }

    pub fn options(&self) -> Option<&ReferenceOptions> {
        self.options.as_ref()
    }

    pub fn match_rule(&self) -> MatchRule {
        self.options
            .as_ref()
            .map(|o| o.match_rule)
            .unwrap_or_default()
    }

    pub fn search_scope(&self) -> SearchScope {
        self.options
            .as_ref()
            .map(|o| o.search_scope)
            .unwrap_or_default()
    }

    pub fn is_optional(&self) -> bool {
        self.options.as_ref().is_some_and(|o| o.optional)
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn category_names(&self) -> &[String] {
        &self.category_names
    }

    /// Categories of this reference as defined by its site.
    ///
    /// Names the site does not define are reported once and dropped.
    pub fn categories(&self) -> &[Category] {
        self.categories.get_or_init(|| {
            self.category_names
                .iter()
                .filter_map(|name| {
                    let category = self.site.category(name);
                    if category.is_none() {
                        warn!("Category {} not found in site: {}", name, self.site.url());
                    }
                    category
                })
                .collect()
        })
    }

    /// The exact feature, if already resolved
    pub fn exact_match(&self) -> Option<Arc<Feature>> {
        self.exact.get().cloned()
    }

    /// The best-match feature, if already resolved
    pub fn best_match(&self) -> Option<Arc<Feature>> {
        self.best.get().cloned()
    }

    pub fn best_match_state(&self) -> BestMatchState {
        match (self.best.get(), self.exact.get()) {
            (None, _) => BestMatchState::Unresolved,
            (Some(best), Some(exact)) if Arc::ptr_eq(best, exact) => BestMatchState::ResolvedToSelf,
            (Some(_), _) => BestMatchState::ResolvedToCandidate,
        }
    }

    pub(crate) fn exact_slot(&self) -> &OnceCell<Arc<Feature>> {
        &self.exact
    }

    pub(crate) fn best_slot(&self) -> &OnceCell<Arc<Feature>> {
        &self.best
    }
}

impl fmt::Debug for FeatureReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureReference")
            .field("site", &self.site.url().as_str())
            .field("url", &self.url.as_str())
            .field("feature_type", &self.feature_type)
            .field("declared_id", &self.declared_id)
            .field("options", &self.options)
            .field("disabled", &self.disabled)
            .field("best_match_state", &self.best_match_state())
            .finish()
    }
}
