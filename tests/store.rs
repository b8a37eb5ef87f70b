//! End-to-end resolution against persisted sites and real manifests

use std::path::Path;
use std::sync::Arc;

use reqwest::Url;
use tempfile::TempDir;

use feature_resolver::feature::context::ResolveContext;
use feature_resolver::feature::error::ResolutionError;
use feature_resolver::feature::factory::FeatureTypeRegistry;
use feature_resolver::feature::options::ReferenceOptions;
use feature_resolver::feature::reference::{BestMatchState, FeatureReference};
use feature_resolver::feature::resolver::ReferenceResolver;
use feature_resolver::feature::rule::MatchRule;
use feature_resolver::feature::site::Site;
use feature_resolver::feature::sites::{ConfiguredFeature, SiteDescription, SiteStore, StaticSite};

fn write_manifest(dir: &Path, name: &str, id: &str, version: &str, label: &str) {
    let manifest = serde_json::json!({ "id": id, "version": version, "label": label });
    std::fs::write(dir.join(name), manifest.to_string()).unwrap();
}

fn site_url(dir: &Path) -> Url {
    Url::from_directory_path(dir).unwrap()
}

fn open_store(dir: &TempDir) -> Arc<SiteStore> {
    let features = dir.path().join("features");
    SiteStore::open(&dir.path().join("sites.db"), site_url(&features)).unwrap()
}

fn resolver() -> ReferenceResolver {
    ReferenceResolver::new(Arc::new(FeatureTypeRegistry::with_defaults()))
}

fn setup_features(dir: &TempDir) -> Url {
    let features = dir.path().join("features");
    std::fs::create_dir_all(&features).unwrap();
    write_manifest(&features, "foo_1.2.0.json", "com.example.foo", "1.2.0", "Foo");
    write_manifest(&features, "foo_1.4.0.json", "com.example.foo", "1.4.0", "Foo 1.4");
    write_manifest(&features, "foo_2.0.0.json", "com.example.foo", "2.0.0", "Foo 2");
    write_manifest(&features, "bar_1.9.0.json", "com.example.bar", "1.9.0", "Bar");
    site_url(&features)
}

#[tokio::test]
async fn store_candidates_resolve_from_manifests() {
    let dir = TempDir::new().unwrap();
    let base = setup_features(&dir);
    let store = open_store(&dir);

    for name in ["foo_2.0.0.json", "bar_1.9.0.json", "foo_1.4.0.json"] {
        store
            .configure(&ConfiguredFeature::new(base.join(name).unwrap()))
            .unwrap();
    }

    let reference = FeatureReference::new(store.clone(), base.join("foo_1.2.0.json").unwrap())
        .with_options(Some(ReferenceOptions::with_rule(MatchRule::Compatible)));
    let resolver = resolver();
    let ctx = ResolveContext::unbounded();

    let best = resolver.resolve_best(&reference, &ctx).await.unwrap();

    assert_eq!(best.url(), &base.join("foo_1.4.0.json").unwrap());
    assert_eq!(best.label(), Some("Foo 1.4"));
    assert_eq!(
        resolver.display_name(&reference, &ctx).await.unwrap(),
        "Foo 1.4"
    );
    assert_eq!(
        reference.best_match_state(),
        BestMatchState::ResolvedToCandidate
    );
}

#[tokio::test]
async fn disabled_winner_leaves_reference_on_itself() {
    let dir = TempDir::new().unwrap();
    let base = setup_features(&dir);
    let store = open_store(&dir);
    let winner = base.join("foo_1.4.0.json").unwrap();

    store.configure(&ConfiguredFeature::new(winner.clone())).unwrap();
    assert!(store.disable(&winner).unwrap());

    let reference = FeatureReference::new(store.clone(), base.join("foo_1.2.0.json").unwrap())
        .with_options(Some(ReferenceOptions::with_rule(MatchRule::GreaterOrEqual)));

    let best = resolver()
        .resolve_best(&reference, &ResolveContext::unbounded())
        .await
        .unwrap();

    assert_eq!(best.versioned_id().version().to_string(), "1.2.0");
    assert_eq!(reference.best_match_state(), BestMatchState::ResolvedToSelf);
}

#[tokio::test]
async fn imported_site_keeps_declared_order() {
    let dir = TempDir::new().unwrap();
    let base = setup_features(&dir);
    let description = SiteDescription::from_json(
        &serde_json::json!({
            "url": base.as_str(),
            "categories": [{"name": "tools", "label": "Tools"}],
            "features": [
                {"url": "foo_1.4.0.json", "categories": ["tools"]},
                {"url": "foo_2.0.0.json", "options": {"match": 3}},
            ]
        })
        .to_string(),
    )
    .unwrap();
    let static_site = StaticSite::from_description(&description).unwrap();
    let store = open_store(&dir);

    assert_eq!(store.import(&static_site).unwrap(), 2);

    let candidates = store.configured_candidates().await.unwrap().unwrap();
    let urls: Vec<_> = candidates.iter().map(|c| c.url().clone()).collect();
    assert_eq!(
        urls,
        vec![
            base.join("foo_1.4.0.json").unwrap(),
            base.join("foo_2.0.0.json").unwrap()
        ]
    );
    assert_eq!(candidates[0].categories()[0].label, "Tools");
}

#[tokio::test]
async fn imported_site_resolves_like_its_description() {
    let dir = TempDir::new().unwrap();
    let base = setup_features(&dir);
    let description = SiteDescription::from_json(
        &serde_json::json!({
            "url": base.as_str(),
            "defaultFeatureType": "binary",
            "features": [
                {"url": "foo_1.2.0.json", "type": "packaged", "options": {"match": 3}},
                {"url": "foo_1.4.0.json", "type": "packaged"},
                {"url": "bar_1.9.0.json"},
            ]
        })
        .to_string(),
    )
    .unwrap();
    let static_site = StaticSite::from_description(&description).unwrap();
    let store = open_store(&dir);
    store.import(&static_site).unwrap();

    let sites: [Arc<dyn Site>; 2] = [static_site, store];
    for site in sites {
        let resolver = resolver();
        let ctx = ResolveContext::unbounded();

        let listed = site.reference_to(&base.join("foo_1.2.0.json").unwrap()).unwrap();
        let best = resolver.resolve_best(&listed, &ctx).await.unwrap();
        assert_eq!(best.url(), &base.join("foo_1.4.0.json").unwrap());

        let bare = site.reference_to(&base.join("bar_1.9.0.json").unwrap()).unwrap();
        assert_eq!(
            resolver.resolve_exact(&bare, &ctx).await,
            Err(ResolutionError::UnknownType("binary".to_string()))
        );
    }
}

#[tokio::test]
async fn http_site_resolves_best_candidate() {
    let mut server = mockito::Server::new_async().await;
    let manifest = |version: &str| {
        serde_json::json!({ "id": "com.example.foo", "version": version }).to_string()
    };

    let _own = server
        .mock("GET", "/features/foo_1.0.0.json")
        .with_status(200)
        .with_body(manifest("1.0.0"))
        .create_async()
        .await;
    let _candidate = server
        .mock("GET", "/features/foo_1.0.7.json")
        .with_status(200)
        .with_body(manifest("1.0.7"))
        .create_async()
        .await;
    let _missing = server
        .mock("GET", "/features/gone.json")
        .with_status(404)
        .create_async()
        .await;

    let description = SiteDescription::from_json(
        &serde_json::json!({
            "url": format!("{}/", server.url()),
            "features": [
                {"url": "features/gone.json"},
                {"url": "features/foo_1.0.7.json"},
            ]
        })
        .to_string(),
    )
    .unwrap();
    let site = StaticSite::from_description(&description).unwrap();
    let reference = FeatureReference::new(site.clone(), site.join("features/foo_1.0.0.json").unwrap())
        .with_options(Some(ReferenceOptions::with_rule(MatchRule::Equivalent)));

    let best = resolver()
        .resolve_best(&reference, &ResolveContext::unbounded())
        .await
        .unwrap();

    assert_eq!(best.versioned_id().version().to_string(), "1.0.7");
}
