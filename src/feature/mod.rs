//! Feature reference resolution
//!
//! This module decides which concrete feature version a reference resolves
//! to, given the candidates configured at the reference's site.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Reference  │────▶│  Resolver   │────▶│   Factory   │
//! │ (id, rule)  │     │(exact, best)│     │  registry   │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!        │                   │                   │
//!        ▼                   ▼                   ▼
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │    Site     │     │  MatchRule  │     │  Manifest   │
//! │ (candidates)│     │(version cmp)│     │ (file/http) │
//! └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`identifier`]: Feature versions and versioned identifiers
//! - [`rule`]: Match rules and candidate matching
//! - [`options`]: Options carried by a reference
//! - [`reference`]: Feature references with their set-once resolution slots
//! - [`resolver`]: Exact and best-match resolution
//! - [`context`]: Deadline and cancellation for a resolution
//! - [`factory`]: Feature factory trait and type registry
//! - [`factories`]: Concrete factories
//! - [`site`]: Site trait exposing the candidate pool
//! - [`sites`]: Site description loading, in-memory sites and the SQLite store
//! - [`error`]: Error types
//! - [`types`]: Resolved features, categories and manifests

pub mod context;
pub mod error;
pub mod factories;
pub mod factory;
pub mod identifier;
pub mod options;
pub mod reference;
pub mod resolver;
pub mod rule;
pub mod site;
pub mod sites;
pub mod types;
