//! Immutable session configuration and browser impersonation profiles.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::user_agent::{self, CHROME_USER_AGENT, FIREFOX_USER_AGENT};

/// Default connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 15;

/// Default timeout for page and metadata requests, and idle timeout for transfer reads.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Header set presented to remote servers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImpersonationProfile {
    /// Desktop Chrome headers.
    #[default]
    Chrome,
    /// Desktop Firefox headers.
    Firefox,
    /// Honest tool identifier, no browser disguise.
    Tool,
}

impl ImpersonationProfile {
    /// User-Agent header value for this profile.
    #[must_use]
    pub fn user_agent(self) -> String {
        match self {
            Self::Chrome => CHROME_USER_AGENT.to_string(),
            Self::Firefox => FIREFOX_USER_AGENT.to_string(),
            Self::Tool => user_agent::tool_user_agent(),
        }
    }

    /// Accept header used for HTML page requests.
    #[must_use]
    pub fn page_accept(self) -> &'static str {
        match self {
            Self::Chrome => {
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8"
            }
            Self::Firefox => "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            Self::Tool => "text/html,*/*;q=0.8",
        }
    }

    /// Accept header used for media transfers.
    #[must_use]
    pub fn media_accept(self) -> &'static str {
        match self {
            Self::Firefox => "video/webm,video/ogg,video/*;q=0.9,*/*;q=0.8",
            Self::Chrome | Self::Tool => "*/*",
        }
    }

    /// Stable lowercase label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Chrome => "chrome",
            Self::Firefox => "firefox",
            Self::Tool => "tool",
        }
    }
}

impl fmt::Display for ImpersonationProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImpersonationProfile {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "chrome" => Ok(Self::Chrome),
            "firefox" => Ok(Self::Firefox),
            "tool" => Ok(Self::Tool),
            other => Err(format!(
                "unknown profile '{other}' (expected chrome, firefox, or tool)"
            )),
        }
    }
}

/// Settings shared by every request of one resolve/transfer run.
///
/// Built once and handed to [`SessionClient::new`](super::SessionClient::new); never
/// mutated afterwards. The auth cookie is redacted from `Debug` output.
#[derive(Clone)]
pub struct SessionConfig {
    profile: ImpersonationProfile,
    accept_language: String,
    auth_cookie: Option<String>,
    proxy: Option<String>,
    connect_timeout: Duration,
    request_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionConfig {
    /// Chrome profile, no cookie, no proxy, default timeouts.
    #[must_use]
    pub fn new() -> Self {
        Self {
            profile: ImpersonationProfile::default(),
            accept_language: "en-US,en;q=0.9".to_string(),
            auth_cookie: None,
            proxy: None,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    /// Sets the impersonation profile.
    #[must_use]
    pub fn with_profile(mut self, profile: ImpersonationProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Sets the auth cookie sent with share-page requests. Blank values are ignored.
    #[must_use]
    pub fn with_auth_cookie(mut self, cookie: Option<String>) -> Self {
        self.auth_cookie = cookie
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        self
    }

    /// Routes all traffic through an upstream proxy. Blank values are ignored.
    #[must_use]
    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy = proxy
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        self
    }

    /// Sets the connect timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the request timeout (also the idle-read timeout for transfers).
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Impersonation profile.
    #[must_use]
    pub fn profile(&self) -> ImpersonationProfile {
        self.profile
    }

    /// Accept-Language header value.
    #[must_use]
    pub fn accept_language(&self) -> &str {
        &self.accept_language
    }

    /// Auth cookie value, if configured. Sensitive: never log it.
    #[must_use]
    pub fn auth_cookie(&self) -> Option<&str> {
        self.auth_cookie.as_deref()
    }

    /// Upstream proxy URL, if configured.
    #[must_use]
    pub fn proxy(&self) -> Option<&str> {
        self.proxy.as_deref()
    }

    /// Connect timeout.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Request timeout.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("profile", &self.profile)
            .field("accept_language", &self.accept_language)
            .field(
                "auth_cookie",
                &self.auth_cookie.as_ref().map(|_| "<redacted>"),
            )
            .field("proxy", &self.proxy)
            .field("connect_timeout", &self.connect_timeout)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_cookie() {
        let config = SessionConfig::new().with_auth_cookie(Some("session=secret-value".into()));
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret-value"), "cookie leaked: {debug}");
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_blank_cookie_and_proxy_are_ignored() {
        let config = SessionConfig::new()
            .with_auth_cookie(Some("   ".into()))
            .with_proxy(Some(String::new()));
        assert!(config.auth_cookie().is_none());
        assert!(config.proxy().is_none());
    }

    #[test]
    fn test_profile_from_str() {
        assert_eq!(
            "Firefox".parse::<ImpersonationProfile>().unwrap(),
            ImpersonationProfile::Firefox
        );
        assert_eq!(
            "tool".parse::<ImpersonationProfile>().unwrap(),
            ImpersonationProfile::Tool
        );
        assert!("safari".parse::<ImpersonationProfile>().is_err());
    }

    #[test]
    fn test_tool_profile_identifies_tool() {
        assert!(ImpersonationProfile::Tool.user_agent().starts_with("clipfetch/"));
        assert!(
            ImpersonationProfile::Chrome
                .user_agent()
                .contains("Chrome/")
        );
    }

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.profile(), ImpersonationProfile::Chrome);
        assert_eq!(
            config.request_timeout(),
            Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)
        );
    }
}
