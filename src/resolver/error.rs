//! Error types for resolution.
//!
//! Messages follow the What/Why/Suggestion layout used across the crate.

use std::fmt::Write as _;
use std::path::PathBuf;

use thiserror::Error;

/// One strategy's recorded non-success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyAttempt {
    /// Strategy name.
    pub strategy: String,
    /// `true` when the strategy did not apply rather than failing.
    pub skipped: bool,
    /// Why it skipped or failed.
    pub reason: String,
}

/// Errors that can occur during resolution.
#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    /// A single strategy applied but could not produce a target.
    #[error("{strategy} failed: {reason}")]
    StrategyFailed {
        /// Strategy name.
        strategy: String,
        /// Why it failed (includes the URL involved, if any).
        reason: String,
    },

    /// Every applicable strategy failed.
    #[error(
        "no strategy resolved '{link}':{}\n  Suggestion: {suggestion}",
        summarize(.attempts)
    )]
    ResolutionExhausted {
        /// The canonical share-link.
        link: String,
        /// Each strategy tried, in order.
        attempts: Vec<StrategyAttempt>,
        /// Diagnostic page dump, when one was written.
        diagnostic: Option<PathBuf>,
        /// How to proceed.
        suggestion: String,
    },
}

impl ResolveError {
    /// Creates a `StrategyFailed` error.
    #[must_use]
    pub fn strategy_failed(strategy: &str, reason: impl Into<String>) -> Self {
        Self::StrategyFailed {
            strategy: strategy.to_string(),
            reason: reason.into(),
        }
    }

    /// Creates a `ResolutionExhausted` error.
    #[must_use]
    pub fn exhausted(link: &str, attempts: Vec<StrategyAttempt>, diagnostic: Option<PathBuf>) -> Self {
        let suggestion = match &diagnostic {
            Some(path) => format!(
                "Inspect the saved page at {} or pass an auth cookie with --cookie",
                path.display()
            ),
            None => "Check the link is public, or try the other pipeline with --pipeline".to_string(),
        };
        Self::ResolutionExhausted {
            link: link.to_string(),
            attempts,
            diagnostic,
            suggestion,
        }
    }

    /// Diagnostic file written before failing, if any.
    #[must_use]
    pub fn diagnostic(&self) -> Option<&PathBuf> {
        match self {
            Self::ResolutionExhausted { diagnostic, .. } => diagnostic.as_ref(),
            Self::StrategyFailed { .. } => None,
        }
    }
}

fn summarize(attempts: &[StrategyAttempt]) -> String {
    if attempts.is_empty() {
        return " no strategy was registered".to_string();
    }
    let mut out = String::new();
    for attempt in attempts {
        let verb = if attempt.skipped { "skipped" } else { "failed" };
        let _ = write!(out, "\n  - {} {verb}: {}", attempt.strategy, attempt.reason);
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn attempt(strategy: &str, skipped: bool, reason: &str) -> StrategyAttempt {
        StrategyAttempt {
            strategy: strategy.to_string(),
            skipped,
            reason: reason.to_string(),
        }
    }

    #[test]
    fn test_exhausted_lists_every_strategy() {
        let err = ResolveError::exhausted(
            "https://example.host/p/x",
            vec![
                attempt("page_embedded", false, "marker not found"),
                attempt("proxy_fallback", true, "no asset id"),
            ],
            None,
        );
        let msg = err.to_string();
        assert!(msg.contains("page_embedded failed: marker not found"), "{msg}");
        assert!(msg.contains("proxy_fallback skipped: no asset id"), "{msg}");
        assert!(msg.contains("Suggestion:"));
    }

    #[test]
    fn test_exhausted_suggestion_names_diagnostic_file() {
        let err = ResolveError::exhausted(
            "https://example.host/p/x",
            vec![attempt("page_embedded", false, "marker not found")],
            Some(PathBuf::from("/tmp/clipfetch-debug.html")),
        );
        assert!(err.to_string().contains("/tmp/clipfetch-debug.html"));
        assert_eq!(
            err.diagnostic().unwrap(),
            &PathBuf::from("/tmp/clipfetch-debug.html")
        );
    }

    #[test]
    fn test_strategy_failed_display() {
        let err = ResolveError::strategy_failed("browser_capture", "driver exited with 1");
        assert_eq!(err.to_string(), "browser_capture failed: driver exited with 1");
        assert!(err.diagnostic().is_none());
    }
}
