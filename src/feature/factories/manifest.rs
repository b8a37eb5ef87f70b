//! Factory reading JSON feature manifests from local files or HTTP

use reqwest::Url;
use tracing::{debug, warn};

use crate::feature::error::ResolutionError;
use crate::feature::factory::FeatureFactory;
use crate::feature::identifier::VersionedIdentifier;
use crate::feature::site::Site;
use crate::feature::types::{Feature, FeatureManifest};

/// Builds features from a manifest such as
/// `{"id": "com.example.foo", "version": "1.2.0", "label": "Foo"}`
///
/// Only the manifest is read; feature archives are never downloaded.
#[derive(Clone)]
pub struct ManifestFeatureFactory {
    client: reqwest::Client,
}

impl ManifestFeatureFactory {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn read_manifest(&self, url: &Url) -> Result<String, ResolutionError> {
        match url.scheme() {
            "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|_| ResolutionError::unresolvable(url, "not a local path"))?;
                tokio::fs::read_to_string(&path)
                    .await
                    .map_err(|e| ResolutionError::unresolvable(url, e))
            }
            "http" | "https" => self.fetch_manifest(url).await,
            scheme => Err(ResolutionError::unresolvable(
                url,
                format!("unsupported scheme: {}", scheme),
            )),
        }
    }

    async fn fetch_manifest(&self, url: &Url) -> Result<String, ResolutionError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| ResolutionError::unresolvable(url, e))?;

        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ResolutionError::unresolvable(url, "manifest not found"));
        }

        if !status.is_success() {
            warn!("Feature site returned status {}: {}", status, url);
            return Err(ResolutionError::unresolvable(
                url,
                format!("Unexpected status: {}", status),
            ));
        }

        response
            .text()
            .await
            .map_err(|e| ResolutionError::unresolvable(url, e))
    }
}

impl Default for ManifestFeatureFactory {
    fn default() -> Self {
        Self::new(
            reqwest::Client::builder()
                .user_agent("feature-resolver")
                .build()
                .expect("Failed to create HTTP client"),
        )
    }
}

#[async_trait::async_trait]
impl FeatureFactory for ManifestFeatureFactory {
    async fn create_feature(
        &self,
        feature_type: &str,
        url: &Url,
        site: &dyn Site,
    ) -> Result<Feature, ResolutionError> {
        debug!("Reading feature manifest {} from site {}", url, site.url());

        let body = self.read_manifest(url).await?;
        let manifest: FeatureManifest = serde_json::from_str(&body).map_err(|e| {
            warn!("Failed to parse feature manifest {}: {}", url, e);
            ResolutionError::unresolvable(url, e)
        })?;

        let versioned_id = VersionedIdentifier::new(&manifest.id, &manifest.version)
            .map_err(|e| ResolutionError::unresolvable(url, e))?;

        Ok(Feature::new(versioned_id, url.clone(), feature_type).with_label(manifest.label))
    }
}
