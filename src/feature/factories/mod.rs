//! Feature factory implementations

pub mod manifest;

pub use manifest::ManifestFeatureFactory;
