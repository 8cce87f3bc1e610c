//! Share-link validation and asset identifier extraction.
//!
//! A [`ShareLink`] is the canonical form of a user-supplied URL. Normalization is a
//! pure string transformation: it never touches the network.
//!
//! # Example
//!
//! ```
//! use clipfetch_core::target::ShareLinkPattern;
//!
//! let pattern = ShareLinkPattern::new("example.host", "/p/");
//! let link = pattern.normalize(" https://example.host/p/s_abc123?x=1 ").unwrap();
//! assert_eq!(link.as_str(), "https://example.host/p/s_abc123");
//! assert_eq!(link.asset_id().map(|id| id.as_str()), Some("s_abc123"));
//! ```

mod error;

pub use error::TargetError;

use std::fmt;

use url::Url;

/// Default host of public share-links.
pub const DEFAULT_SHARE_HOST: &str = "sora.chatgpt.com";

/// Default path marker preceding the post identifier.
pub const DEFAULT_PATH_MARKER: &str = "/p/";

/// Opaque post identifier used to build proxy transfer targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetId(String);

impl AssetId {
    /// Wraps an identifier, rejecting empty or whitespace-only values.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Returns the identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated, canonical share-link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareLink {
    url: Url,
    asset_id: Option<AssetId>,
}

impl ShareLink {
    /// Canonical URL string (no query or fragment).
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    /// Parsed canonical URL.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Identifier taken from the path, if the segment was present.
    #[must_use]
    pub fn asset_id(&self) -> Option<&AssetId> {
        self.asset_id.as_ref()
    }

    /// Path and query-free suffix after the host, e.g. `/p/s_abc123`.
    #[must_use]
    pub fn path(&self) -> &str {
        self.url.path()
    }
}

impl fmt::Display for ShareLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}

/// Host and path rules a share-link must satisfy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareLinkPattern {
    host: String,
    path_marker: String,
}

impl Default for ShareLinkPattern {
    fn default() -> Self {
        Self::new(DEFAULT_SHARE_HOST, DEFAULT_PATH_MARKER)
    }
}

impl ShareLinkPattern {
    /// Creates a pattern for `host` with the given path marker (e.g. `/p/`).
    #[must_use]
    pub fn new(host: impl Into<String>, path_marker: impl Into<String>) -> Self {
        let mut path_marker = path_marker.into();
        if !path_marker.starts_with('/') {
            path_marker.insert(0, '/');
        }
        if !path_marker.ends_with('/') {
            path_marker.push('/');
        }
        Self {
            host: canonical_host(&host.into()),
            path_marker,
        }
    }

    /// Host accepted by this pattern (lowercase, no `www.`).
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The `https://<host><marker>` prefix shown to users.
    #[must_use]
    pub fn expected_prefix(&self) -> String {
        format!("https://{}{}", self.host, self.path_marker)
    }

    /// Validates `input` and returns its canonical [`ShareLink`].
    ///
    /// # Errors
    ///
    /// Returns [`TargetError::InvalidTarget`] when the input is not an `https` URL on
    /// the configured host whose path starts with the marker.
    pub fn normalize(&self, input: &str) -> Result<ShareLink, TargetError> {
        let cleaned = clean_input(input);
        let prefix = self.expected_prefix();

        if cleaned.is_empty() {
            return Err(TargetError::invalid(cleaned, "input is empty", &prefix));
        }

        let mut url = Url::parse(cleaned)
            .map_err(|_| TargetError::invalid(cleaned, "not a valid URL", &prefix))?;

        if url.scheme() != "https" {
            return Err(TargetError::invalid(
                cleaned,
                "scheme must be https",
                &prefix,
            ));
        }

        let host_ok = url
            .host_str()
            .is_some_and(|host| canonical_host(host) == self.host);
        if !host_ok {
            return Err(TargetError::invalid(
                cleaned,
                &format!("host must be {}", self.host),
                &prefix,
            ));
        }

        let Some(rest) = url.path().strip_prefix(self.path_marker.as_str()) else {
            return Err(TargetError::invalid(
                cleaned,
                &format!("path must start with {}", self.path_marker),
                &prefix,
            ));
        };

        let asset_id = extract_asset_segment(rest).and_then(AssetId::new);

        url.set_query(None);
        url.set_fragment(None);

        Ok(ShareLink { url, asset_id })
    }
}

/// Normalizes `input` against the default share host.
///
/// # Errors
///
/// See [`ShareLinkPattern::normalize`].
pub fn normalize(input: &str) -> Result<ShareLink, TargetError> {
    ShareLinkPattern::default().normalize(input)
}

fn clean_input(input: &str) -> &str {
    input.trim().trim_end_matches([',', '.']).trim_end()
}

fn canonical_host(host: &str) -> String {
    let lower = host.trim().trim_end_matches('.').to_ascii_lowercase();
    lower
        .strip_prefix("www.")
        .map_or_else(|| lower.clone(), str::to_string)
}

fn extract_asset_segment(rest: &str) -> Option<&str> {
    let segment = rest.split('/').next()?;
    let valid = !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-'));
    valid.then_some(segment)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn pattern() -> ShareLinkPattern {
        ShareLinkPattern::new("example.host", "/p/")
    }

    #[test]
    fn test_normalize_accepts_share_link_and_extracts_id() {
        let link = pattern().normalize("https://example.host/p/s_abc123").unwrap();
        assert_eq!(link.as_str(), "https://example.host/p/s_abc123");
        assert_eq!(link.asset_id().unwrap().as_str(), "s_abc123");
    }

    #[test]
    fn test_normalize_strips_query_fragment_and_trailing_punctuation() {
        let link = pattern()
            .normalize("  https://example.host/p/s_abc123?utm=x#frag,. ")
            .unwrap();
        assert_eq!(link.as_str(), "https://example.host/p/s_abc123");
    }

    #[test]
    fn test_normalize_accepts_www_and_mixed_case_host() {
        let link = pattern().normalize("https://WWW.Example.Host/p/id-1").unwrap();
        assert_eq!(link.asset_id().unwrap().as_str(), "id-1");
    }

    #[test]
    fn test_normalize_missing_segment_yields_no_asset_id() {
        let link = pattern().normalize("https://example.host/p/").unwrap();
        assert!(link.asset_id().is_none());
    }

    #[test]
    fn test_normalize_invalid_segment_characters_yield_no_asset_id() {
        let link = pattern().normalize("https://example.host/p/a%20b").unwrap();
        assert!(link.asset_id().is_none());
    }

    #[test]
    fn test_normalize_rejects_wrong_scheme() {
        let err = pattern().normalize("http://example.host/p/abc").unwrap_err();
        assert!(err.to_string().contains("https"));
    }

    #[test]
    fn test_normalize_rejects_wrong_host() {
        assert!(pattern().normalize("https://evil.example/p/abc").is_err());
        assert!(pattern().normalize("https://example.host.evil/p/abc").is_err());
    }

    #[test]
    fn test_normalize_rejects_wrong_path() {
        assert!(pattern().normalize("https://example.host/explore").is_err());
        assert!(pattern().normalize("https://example.host/px/abc").is_err());
    }

    #[test]
    fn test_normalize_rejects_non_urls() {
        for input in ["", "   ", "not a url", "example.host/p/abc", "s_abc123"] {
            let result = pattern().normalize(input);
            assert!(
                matches!(result, Err(TargetError::InvalidTarget { .. })),
                "expected InvalidTarget for {input:?}"
            );
        }
    }

    #[test]
    fn test_default_pattern_uses_default_host() {
        let link = normalize("https://sora.chatgpt.com/p/s_69399f8654808191876cb4613d165b5e")
            .unwrap();
        assert_eq!(
            link.asset_id().unwrap().as_str(),
            "s_69399f8654808191876cb4613d165b5e"
        );
    }

    #[test]
    fn test_pattern_marker_is_normalized_with_slashes() {
        let pattern = ShareLinkPattern::new("example.host", "p");
        assert_eq!(pattern.expected_prefix(), "https://example.host/p/");
    }

    #[test]
    fn test_asset_id_rejects_blank() {
        assert!(AssetId::new("  ").is_none());
        assert_eq!(AssetId::new(" abc ").unwrap().as_str(), "abc");
    }
}
