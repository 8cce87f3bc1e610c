//! Shared User-Agent strings for session profiles.
//!
//! Single source for the browser strings used by impersonation profiles and for the
//! honest tool identifier.

/// Project URL for the tool User-Agent.
const PROJECT_UA_URL: &str = "https://github.com/fierce/clipfetch";

/// Desktop Chrome on Windows.
pub(crate) const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Desktop Firefox on Windows (matches the browser capture driver's default).
pub(crate) const FIREFOX_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:128.0) Gecko/20100101 Firefox/128.0";

/// User-Agent that identifies the tool itself.
#[must_use]
pub(crate) fn tool_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("clipfetch/{version} (+{PROJECT_UA_URL})")
}
