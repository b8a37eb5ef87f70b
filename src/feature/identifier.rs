//! Feature versions and versioned identifiers
//!
//! Versions have the form `major.minor.micro[.qualifier]`. Partial versions
//! are padded with zeros, so `1` reads as `1.0.0` and `1.2` as `1.2.0`.
//! Ordering compares the numeric components first and the qualifier last, as
//! a plain string, with the empty qualifier sorting before any other.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use semver::Version;

use crate::feature::error::VersionError;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FeatureVersion {
    numeric: Version,
    qualifier: String,
}

impl FeatureVersion {
    pub fn new(major: u64, minor: u64, micro: u64) -> Self {
        Self {
            numeric: Version::new(major, minor, micro),
            qualifier: String::new(),
        }
    }

    pub fn with_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = qualifier.into();
        self
    }

    pub fn major(&self) -> u64 {
        self.numeric.major
    }

    pub fn minor(&self) -> u64 {
        self.numeric.minor
    }

    pub fn micro(&self) -> u64 {
        self.numeric.patch
    }

    pub fn qualifier(&self) -> &str {
        &self.qualifier
    }

    /// Full equality, qualifier included
    pub fn is_perfect(&self, nominal: &FeatureVersion) -> bool {
        self == nominal
    }

    /// Same major version and not older than `nominal`
    pub fn is_compatible_with(&self, nominal: &FeatureVersion) -> bool {
        self.major() == nominal.major() && self >= nominal
    }

    /// Same major and minor version and not older than `nominal`
    pub fn is_equivalent_to(&self, nominal: &FeatureVersion) -> bool {
        self.major() == nominal.major() && self.minor() == nominal.minor() && self >= nominal
    }

    pub fn is_greater_or_equal_to(&self, nominal: &FeatureVersion) -> bool {
        self >= nominal
    }

    pub fn is_greater_than(&self, other: &FeatureVersion) -> bool {
        self > other
    }
}

impl Ord for FeatureVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.numeric
            .cmp(&other.numeric)
            .then_with(|| self.qualifier.cmp(&other.qualifier))
    }
}

impl PartialOrd for FeatureVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for FeatureVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || VersionError::InvalidVersion(s.to_string());
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(invalid());
        }

        let parts: Vec<&str> = trimmed.splitn(4, '.').collect();
        let number = |part: &str| -> Result<u64, VersionError> {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            part.parse::<u64>().map_err(|_| invalid())
        };

        let major = number(parts[0])?;
        let minor = parts.get(1).map(|p| number(p)).transpose()?.unwrap_or(0);
        let micro = parts.get(2).map(|p| number(p)).transpose()?.unwrap_or(0);
        let qualifier = match parts.get(3) {
            Some(q) if q.is_empty() || !q.chars().all(is_qualifier_char) => {
                return Err(invalid());
            }
            Some(q) => (*q).to_string(),
            None => String::new(),
        };

        Ok(Self::new(major, minor, micro).with_qualifier(qualifier))
    }
}

fn is_qualifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

impl fmt::Display for FeatureVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major(), self.minor(), self.micro())?;
        if !self.qualifier.is_empty() {
            write!(f, ".{}", self.qualifier)?;
        }
        Ok(())
    }
}

/// A feature identifier paired with a version
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionedIdentifier {
    identifier: String,
    version: FeatureVersion,
}

impl VersionedIdentifier {
    pub fn new(identifier: &str, version: &str) -> Result<Self, VersionError> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Err(VersionError::EmptyIdentifier);
        }
        Ok(Self {
            identifier: identifier.to_string(),
            version: version.parse()?,
        })
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn version(&self) -> &FeatureVersion {
        &self.version
    }

    pub fn same_identifier(&self, other: &VersionedIdentifier) -> bool {
        self.identifier == other.identifier
    }
}

impl fmt::Display for VersionedIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.identifier, self.version)
    }
}
