//! Engine construction errors.

use splice_config::ConfigError;

/// Error creating an [`Includer`](crate::Includer).
///
/// Processing a document never fails; only a misconfigured engine does.
#[derive(Debug, thiserror::Error)]
pub enum IncludeError {
    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The directive tokens do not compile into a matcher.
    #[error("invalid directive syntax: {0}")]
    Pattern(#[from] regex::Error),
}
