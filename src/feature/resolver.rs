//! Resolution of feature references to concrete features
//!
//! Exact resolution builds the feature a reference points at. Best-match
//! resolution searches the reference's site for the highest configured
//! version satisfying the reference's match rule, and falls back to the exact
//! feature whenever the search cannot produce a winner.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::feature::context::ResolveContext;
use crate::feature::error::ResolutionError;
use crate::feature::factory::FeatureTypeRegistry;
use crate::feature::identifier::VersionedIdentifier;
use crate::feature::reference::FeatureReference;
use crate::feature::rule::MatchRule;
use crate::feature::types::Feature;

/// Resolves references using a registry of feature factories
#[derive(Clone)]
pub struct ReferenceResolver {
    factories: Arc<FeatureTypeRegistry>,
}

impl ReferenceResolver {
    pub fn new(factories: Arc<FeatureTypeRegistry>) -> Self {
        Self { factories }
    }

    /// The feature at the reference's own URL, ignoring its match rule.
    ///
    /// Computed once per reference; later calls return the same `Arc`.
    pub async fn resolve_exact(
        &self,
        reference: &FeatureReference,
        ctx: &ResolveContext,
    ) -> Result<Arc<Feature>, ResolutionError> {
        reference
            .exact_slot()
            .get_or_try_init(|| self.create_exact(reference, ctx))
            .await
            .cloned()
    }

    /// The best feature satisfying the reference's match rule among the
    /// configured candidates of its site.
    ///
    /// Computed once per reference. Only a failing exact resolution of the
    /// reference itself, or an interruption by `ctx`, is reported as an error.
    pub async fn resolve_best(
        &self,
        reference: &FeatureReference,
        ctx: &ResolveContext,
    ) -> Result<Arc<Feature>, ResolutionError> {
        reference
            .best_slot()
            .get_or_try_init(|| self.search_best(reference, ctx))
            .await
            .cloned()
    }

    /// The identifier the reference currently stands for.
    ///
    /// A resolved exact feature is authoritative over the declared identifier;
    /// without either, the exact feature is resolved.
    pub async fn versioned_identifier(
        &self,
        reference: &FeatureReference,
        ctx: &ResolveContext,
    ) -> Result<VersionedIdentifier, ResolutionError> {
        if let Some(feature) = reference.exact_match() {
            return Ok(feature.versioned_id().clone());
        }
        if let Some(id) = reference.declared_id() {
            return Ok(id.clone());
        }
        let feature = self.resolve_exact(reference, ctx).await?;
        Ok(feature.versioned_id().clone())
    }

    /// Name shown for the reference: the options name if set, otherwise the
    /// best feature's label or identifier
    pub async fn display_name(
        &self,
        reference: &FeatureReference,
        ctx: &ResolveContext,
    ) -> Result<String, ResolutionError> {
        if let Some(name) = reference.options().and_then(|o| o.name.as_ref()) {
            return Ok(name.clone());
        }
        Ok(self.resolve_best(reference, ctx).await?.to_string())
    }

    async fn create_exact(
        &self,
        reference: &FeatureReference,
        ctx: &ResolveContext,
    ) -> Result<Arc<Feature>, ResolutionError> {
        let site = reference.site();
        let feature_type = match reference.feature_type() {
            Some(feature_type) => feature_type.to_string(),
            None => site.default_feature_type(),
        };

        debug!("Creating {} feature from {}", feature_type, reference.url());
        let feature = ctx
            .run(
                self.factories
                    .create(&feature_type, reference.url(), site.as_ref()),
            )
            .await?;

        match reference.declared_id() {
            Some(declared) if declared != feature.versioned_id() => warn!(
                "The versioned identifier of the referenced feature ({}) doesn't match the one of the feature reference ({}): {}",
                feature.versioned_id(),
                declared,
                reference.url()
            ),
            _ => {}
        }

        Ok(Arc::new(feature))
    }

    async fn search_best(
        &self,
        reference: &FeatureReference,
        ctx: &ResolveContext,
    ) -> Result<Arc<Feature>, ResolutionError> {
        let rule = reference.match_rule();
        if rule == MatchRule::Perfect || reference.is_disabled() {
            return self.resolve_exact(reference, ctx).await;
        }

        let site = Arc::clone(reference.site());
        let snapshot = ctx
            .run(async { Ok(site.configured_candidates().await) })
            .await?;
        let candidates = match snapshot {
            Ok(Some(candidates)) => candidates,
            Ok(None) => {
                debug!("No configured site at {}, resolving to self", site.url());
                return self.resolve_exact(reference, ctx).await;
            }
            Err(e) => {
                warn!("Unable to read configured features of {}: {}", site.url(), e);
                return self.resolve_exact(reference, ctx).await;
            }
        };

        let nominal = self.versioned_identifier(reference, ctx).await?;

        match self.select_candidate(&nominal, rule, &candidates, ctx).await? {
            Some(winner) => {
                info!(
                    "Resolved {} with rule {} to {}",
                    nominal,
                    rule,
                    winner.url()
                );
                let rebound = FeatureReference::derived_from(winner)
                    .with_options(reference.options().cloned());
                self.resolve_exact(&rebound, ctx).await
            }
            None => {
                debug!("No candidate matches {} with rule {}", nominal, rule);
                self.resolve_exact(reference, ctx).await
            }
        }
    }

    /// Highest-versioned candidate satisfying `rule`; the first one wins ties.
    ///
    /// Candidates whose identifier cannot be determined are skipped.
    async fn select_candidate<'a>(
        &self,
        nominal: &VersionedIdentifier,
        rule: MatchRule,
        candidates: &'a [FeatureReference],
        ctx: &ResolveContext,
    ) -> Result<Option<&'a FeatureReference>, ResolutionError> {
        let identified = join_all(
            candidates
                .iter()
                .map(|candidate| self.versioned_identifier(candidate, ctx)),
        )
        .await;

        let mut winner: Option<(&FeatureReference, VersionedIdentifier)> = None;
        for (candidate, id) in candidates.iter().zip(identified) {
            let id = match id {
                Ok(id) => id,
                Err(e) if e.is_interruption() => return Err(e),
                Err(e) => {
                    warn!("Skipping candidate {}: {}", candidate.url(), e);
                    continue;
                }
            };

            if !rule.matches(nominal, &id) {
                continue;
            }

            let is_better = winner
                .as_ref()
                .is_none_or(|(_, best)| id.version().is_greater_than(best.version()));
            if is_better {
                winner = Some((candidate, id));
            }
        }

        Ok(winner.map(|(candidate, _)| candidate))
    }
}
