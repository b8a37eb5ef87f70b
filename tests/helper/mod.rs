//! Shared test utilities

pub mod site;

pub use site::{
    FOO, MockFeatureFactory, create_test_resolver, create_test_site, feature_url, reference,
};
