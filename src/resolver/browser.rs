//! Headless-browser driver seam.
//!
//! The browser itself runs out of process. [`CommandBrowserDriver`] launches a helper
//! program and reads newline-delimited JSON events from its stdout:
//!
//! ```text
//! {"type":"request","url":"https://cdn.example/MP4/v.mp4"}
//! {"type":"document","html":"<html>...</html>","title":"Page title"}
//! ```
//!
//! Unknown or malformed lines are ignored.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, instrument};

/// Program name looked up on `PATH` when no browser command is configured.
pub const DEFAULT_BROWSER_COMMAND: &str = "clipfetch-browser";

/// Default wait after navigation so deferred requests can fire.
pub const DEFAULT_SETTLE_MS: u64 = 3000;

/// Default navigation timeout.
pub const DEFAULT_NAVIGATION_TIMEOUT: Duration = Duration::from_secs(60);

// Extra time granted to the helper process on top of navigation and settle time.
const PROCESS_GRACE: Duration = Duration::from_secs(10);

/// Settings passed to the browser driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureOptions {
    /// Run without a visible window.
    pub headless: bool,
    /// Navigation timeout.
    pub timeout: Duration,
    /// Wait after the page is idle before collecting results.
    pub settle: Duration,
    /// Upstream proxy for the browser.
    pub proxy: Option<String>,
    /// User-Agent override.
    pub user_agent: Option<String>,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            headless: true,
            timeout: DEFAULT_NAVIGATION_TIMEOUT,
            settle: Duration::from_millis(DEFAULT_SETTLE_MS),
            proxy: None,
            user_agent: None,
        }
    }
}

/// Everything observed while the page loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrowserCapture {
    /// Outgoing request URLs in the order they were issued.
    pub requests: Vec<String>,
    /// Rendered DOM, if the driver reported it.
    pub html: Option<String>,
    /// Document title as reported by the browser.
    pub title: Option<String>,
}

/// Errors raised by a [`BrowserDriver`].
#[derive(Debug, Error)]
pub enum BrowserError {
    /// The helper program could not be started.
    #[error(
        "could not start browser driver '{program}': {source}\n  Suggestion: install it or pass --browser-command"
    )]
    Spawn {
        /// Program that failed to start.
        program: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The helper did not finish in time.
    #[error("browser driver timed out after {}s", .after.as_secs())]
    Timeout {
        /// Total time allowed.
        after: Duration,
    },

    /// The helper exited unsuccessfully without reporting anything.
    #[error("browser driver exited with {status}: {stderr}")]
    Failed {
        /// Exit status description.
        status: String,
        /// Trimmed stderr output.
        stderr: String,
    },
}

/// Loads a page in a browser and reports its network requests and rendered DOM.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Navigates to `url`, waits for the page to settle, and returns what was seen.
    async fn capture(&self, url: &str, options: &CaptureOptions)
    -> Result<BrowserCapture, BrowserError>;
}

/// Driver backed by an external helper program.
#[derive(Debug, Clone)]
pub struct CommandBrowserDriver {
    program: PathBuf,
}

impl CommandBrowserDriver {
    /// Creates a driver that runs `program`.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Command-line arguments for one capture.
    #[must_use]
    pub fn arguments(url: &str, options: &CaptureOptions) -> Vec<String> {
        let mut args = vec![
            url.to_string(),
            "--timeout-ms".to_string(),
            options.timeout.as_millis().to_string(),
            "--settle-ms".to_string(),
            options.settle.as_millis().to_string(),
            if options.headless {
                "--headless".to_string()
            } else {
                "--visible".to_string()
            },
        ];
        if let Some(proxy) = &options.proxy {
            args.push("--proxy".to_string());
            args.push(proxy.clone());
        }
        if let Some(user_agent) = &options.user_agent {
            args.push("--user-agent".to_string());
            args.push(user_agent.clone());
        }
        args
    }
}

#[async_trait]
impl BrowserDriver for CommandBrowserDriver {
    #[instrument(level = "debug", skip(self, options), fields(program = %self.program.display()))]
    async fn capture(
        &self,
        url: &str,
        options: &CaptureOptions,
    ) -> Result<BrowserCapture, BrowserError> {
        let child = Command::new(&self.program)
            .args(Self::arguments(url, options))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| BrowserError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let budget = options.timeout + options.settle + PROCESS_GRACE;
        let output = tokio::time::timeout(budget, child.wait_with_output())
            .await
            .map_err(|_| BrowserError::Timeout { after: budget })?
            .map_err(|source| BrowserError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let capture = parse_events(&stdout);
        debug!(
            requests = capture.requests.len(),
            has_document = capture.html.is_some(),
            status = %output.status,
            "browser driver finished"
        );

        if !output.status.success() && capture == BrowserCapture::default() {
            return Err(BrowserError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(capture)
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum DriverEvent {
    Request {
        url: String,
    },
    Document {
        html: String,
        #[serde(default)]
        title: Option<String>,
    },
}

/// Parses the helper's JSON-lines output.
#[must_use]
pub(crate) fn parse_events(stdout: &str) -> BrowserCapture {
    let mut capture = BrowserCapture::default();
    for line in stdout.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match serde_json::from_str::<DriverEvent>(line) {
            Ok(DriverEvent::Request { url }) => capture.requests.push(url),
            Ok(DriverEvent::Document { html, title }) => {
                capture.html = Some(html);
                capture.title = title.filter(|t| !t.trim().is_empty());
            }
            Err(err) => debug!(error = %err, "ignoring driver output line"),
        }
    }
    capture
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_arguments_include_flags() {
        let options = CaptureOptions {
            headless: false,
            timeout: Duration::from_secs(5),
            settle: Duration::from_millis(250),
            proxy: Some("http://127.0.0.1:8080".into()),
            user_agent: Some("UA".into()),
        };
        let args = CommandBrowserDriver::arguments("https://example.host/p/x", &options);
        assert_eq!(
            args,
            vec![
                "https://example.host/p/x",
                "--timeout-ms",
                "5000",
                "--settle-ms",
                "250",
                "--visible",
                "--proxy",
                "http://127.0.0.1:8080",
                "--user-agent",
                "UA",
            ]
        );
    }

    #[test]
    fn test_default_arguments_are_headless() {
        let args = CommandBrowserDriver::arguments("u", &CaptureOptions::default());
        assert!(args.contains(&"--headless".to_string()));
        assert!(args.contains(&"3000".to_string()));
    }

    #[test]
    fn test_parse_events_collects_requests_and_document() {
        let stdout = concat!(
            "{\"type\":\"request\",\"url\":\"https://a.example/1.js\"}\n",
            "garbage line\n",
            "{\"type\":\"request\",\"url\":\"https://cdn.example/MP4/v.mp4\"}\n",
            "{\"type\":\"console\",\"text\":\"ignored\"}\n",
            "{\"type\":\"document\",\"html\":\"<html></html>\",\"title\":\"T\"}\n",
        );
        let capture = parse_events(stdout);
        assert_eq!(
            capture.requests,
            vec!["https://a.example/1.js", "https://cdn.example/MP4/v.mp4"]
        );
        assert_eq!(capture.html.as_deref(), Some("<html></html>"));
        assert_eq!(capture.title.as_deref(), Some("T"));
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let driver = CommandBrowserDriver::new("/nonexistent/clipfetch-browser-helper");
        let err = driver
            .capture("https://example.host/p/x", &CaptureOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, BrowserError::Spawn { .. }));
        assert!(err.to_string().contains("--browser-command"));
    }
}
