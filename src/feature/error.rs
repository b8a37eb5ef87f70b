use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("Unable to resolve feature at {url}: {reason}")]
    Unresolvable { url: String, reason: String },

    #[error("No feature factory registered for type: {0}")]
    UnknownType(String),

    #[error("Unknown matching rule: {0}")]
    UnknownMatchRule(String),

    #[error("Resolution deadline exceeded")]
    TimedOut,

    #[error("Resolution cancelled")]
    Cancelled,
}

impl ResolutionError {
    pub fn unresolvable(url: impl ToString, reason: impl ToString) -> Self {
        Self::Unresolvable {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Errors raised by the caller's deadline or cancellation signal rather
    /// than by the feature being inspected
    pub fn is_interruption(&self) -> bool {
        matches!(self, Self::TimedOut | Self::Cancelled)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    #[error("Empty feature identifier")]
    EmptyIdentifier,

    #[error("Invalid version: {0}")]
    InvalidVersion(String),
}

#[derive(Debug, Error)]
pub enum SiteError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid site description: {0}")]
    InvalidDescription(#[from] serde_json::Error),

    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error(transparent)]
    Version(#[from] VersionError),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error("Site store lock poisoned")]
    LockPoisoned,

    #[error("Site is no longer available")]
    Gone,
}
