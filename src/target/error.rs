//! Error types for share-link normalization.

use thiserror::Error;

/// Errors raised while validating a share-link.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TargetError {
    /// The input is not a share-link for the configured host.
    #[error("invalid share-link '{input}': {reason}\n  Suggestion: {suggestion}")]
    InvalidTarget {
        /// The rejected input (trimmed).
        input: String,
        /// Why it was rejected.
        reason: String,
        /// How to fix the input.
        suggestion: String,
    },
}

impl TargetError {
    /// Creates an `InvalidTarget` error with an expected-prefix suggestion.
    #[must_use]
    pub fn invalid(input: &str, reason: &str, expected_prefix: &str) -> Self {
        Self::InvalidTarget {
            input: input.to_string(),
            reason: reason.to_string(),
            suggestion: format!("Paste a link of the form {expected_prefix}<id>"),
        }
    }
}
