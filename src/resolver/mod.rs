//! Multi-strategy resolution of share-links into transfer targets.
//!
//! A [`Resolver`] holds a priority-ordered list of [`ResolveStrategy`] objects and
//! returns the first [`ResolvedTarget`] any of them produces. Two pipelines exist,
//! selected by [`ResolverMode`]:
//!
//! - [`ResolverMode::Page`]: [`PageEmbeddedStrategy`], then [`ProxyFallbackStrategy`],
//!   then [`DegradedEmbeddedStrategy`]. The share page and metadata document are
//!   fetched once per resolve and shared through [`ResolveContext`].
//! - [`ResolverMode::Browser`]: [`BrowserCaptureStrategy`], backed by a
//!   [`BrowserDriver`].
//!
//! Every target carries a [`Quality`] naming how trustworthy it is; degraded results
//! are never returned silently.
//!
//! # Example
//!
//! ```no_run
//! use clipfetch_core::resolver::{ResolverOptions, build_resolver};
//! use clipfetch_core::session::{SessionClient, SessionConfig};
//! use clipfetch_core::target;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let session = SessionClient::new(SessionConfig::new())?;
//! let resolver = build_resolver(session, ResolverOptions::default());
//! let link = target::normalize("https://sora.chatgpt.com/p/s_abc123")?;
//! let resolved = resolver.resolve(&link).await?;
//! println!("{} ({})", resolved.url(), resolved.quality());
//! # Ok(())
//! # }
//! ```

mod browser;
mod capture;
mod embedded;
mod error;
pub mod markers;
mod page;
mod proxy;
mod registry;

pub use browser::{
    BrowserCapture, BrowserDriver, BrowserError, CaptureOptions, CommandBrowserDriver,
    DEFAULT_BROWSER_COMMAND, DEFAULT_SETTLE_MS,
};
pub use capture::BrowserCaptureStrategy;
pub use embedded::{DegradedEmbeddedStrategy, PageEmbeddedStrategy};
pub use error::{ResolveError, StrategyAttempt};
pub use page::{PageSnapshot, PostInfo, PostMetadata};
pub use proxy::ProxyFallbackStrategy;
pub use registry::Resolver;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use url::Url;

use crate::session::SessionClient;
use crate::target::{AssetId, ShareLink};

/// Default metadata API base; the encoded share-link is appended as one path segment.
pub const DEFAULT_METADATA_BASE: &str = "https://api.soracdn.workers.dev/api-proxy";

/// Origin presented to the metadata API.
pub const DEFAULT_METADATA_ORIGIN: &str = "https://sorasave.app";

/// Default proxy base; transfer targets are `<base>/download?id=..&filename=..`.
pub const DEFAULT_PROXY_BASE: &str = "https://api.soracdn.workers.dev";

/// File written to the diagnostic directory when the page pipeline is exhausted.
pub const DIAGNOSTIC_FILE_NAME: &str = "clipfetch-debug.html";

/// How trustworthy a resolved target is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    /// The unmodified source asset.
    Authentic,
    /// Served by the third-party proxy; assumed clean but not verified.
    ProxyFallback,
    /// A lower-quality rendition that may carry a visible watermark.
    WatermarkedFallback,
}

impl Quality {
    /// Stable label used in logs and summaries.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Authentic => "authentic",
            Self::ProxyFallback => "proxy_fallback",
            Self::WatermarkedFallback => "watermarked_fallback",
        }
    }

    /// True for anything other than [`Quality::Authentic`].
    #[must_use]
    pub fn is_fallback(self) -> bool {
        !matches!(self, Self::Authentic)
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A concrete transfer target produced by a strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    url: String,
    suggested_name: Option<String>,
    quality: Quality,
    asset_id: Option<AssetId>,
    strategy: &'static str,
}

impl ResolvedTarget {
    /// Creates a target with no title or asset id.
    #[must_use]
    pub fn new(url: impl Into<String>, quality: Quality, strategy: &'static str) -> Self {
        Self {
            url: url.into(),
            suggested_name: None,
            quality,
            asset_id: None,
            strategy,
        }
    }

    /// Sets the human title used to name the output file.
    #[must_use]
    pub fn with_suggested_name(mut self, name: Option<String>) -> Self {
        self.suggested_name = name
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        self
    }

    /// Sets the asset identifier.
    #[must_use]
    pub fn with_asset_id(mut self, asset_id: Option<AssetId>) -> Self {
        self.asset_id = asset_id;
        self
    }

    /// Absolute URL of the binary resource.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Title before sanitization, if one was found.
    #[must_use]
    pub fn suggested_name(&self) -> Option<&str> {
        self.suggested_name.as_deref()
    }

    /// Quality classification.
    #[must_use]
    pub fn quality(&self) -> Quality {
        self.quality
    }

    /// Asset identifier, if known.
    #[must_use]
    pub fn asset_id(&self) -> Option<&AssetId> {
        self.asset_id.as_ref()
    }

    /// Name of the strategy that produced this target.
    #[must_use]
    pub fn strategy(&self) -> &'static str {
        self.strategy
    }

    /// Proxy thumbnail URL for this asset, when the id is known.
    #[must_use]
    pub fn thumbnail_url(&self, endpoints: &ResolverEndpoints) -> Option<String> {
        let asset_id = self.asset_id.as_ref()?;
        let mut url = endpoints.proxy_endpoint("thumbnail")?;
        url.query_pairs_mut().append_pair("id", asset_id.as_str());
        Some(url.into())
    }
}

/// Which resolution pipeline to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolverMode {
    /// Page inspection, proxy fallback, degraded page lookup.
    #[default]
    Page,
    /// Headless browser network capture with DOM fallback.
    Browser,
}

impl ResolverMode {
    /// Stable lowercase label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Page => "page",
            Self::Browser => "browser",
        }
    }
}

impl fmt::Display for ResolverMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResolverMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "page" => Ok(Self::Page),
            "browser" => Ok(Self::Browser),
            other => Err(format!("unknown pipeline '{other}' (expected page or browser)")),
        }
    }
}

/// Remote endpoints the resolver talks to.
///
/// Overridable so tests can point every request at a local mock server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverEndpoints {
    share_page_base: Option<String>,
    metadata_base: Option<String>,
    metadata_origin: Option<String>,
    proxy_base: String,
}

impl Default for ResolverEndpoints {
    fn default() -> Self {
        Self {
            share_page_base: None,
            metadata_base: Some(DEFAULT_METADATA_BASE.to_string()),
            metadata_origin: Some(DEFAULT_METADATA_ORIGIN.to_string()),
            proxy_base: DEFAULT_PROXY_BASE.to_string(),
        }
    }
}

impl ResolverEndpoints {
    /// Creates endpoints with explicit base URLs and no share-page override.
    #[must_use]
    pub fn with_base_urls(metadata_base: Option<String>, proxy_base: impl Into<String>) -> Self {
        Self {
            share_page_base: None,
            metadata_base: metadata_base.map(|base| trim_base(&base)),
            metadata_origin: None,
            proxy_base: trim_base(&proxy_base.into()),
        }
    }

    /// Fetches share pages from `base` + link path instead of the link itself.
    #[must_use]
    pub fn with_share_page_base(mut self, base: impl Into<String>) -> Self {
        self.share_page_base = Some(trim_base(&base.into()));
        self
    }

    /// Sets the `Origin` sent to the metadata API.
    #[must_use]
    pub fn with_metadata_origin(mut self, origin: Option<String>) -> Self {
        self.metadata_origin = origin;
        self
    }

    /// Replaces the metadata base (`None` disables metadata lookups).
    #[must_use]
    pub fn with_metadata_base(mut self, base: Option<String>) -> Self {
        self.metadata_base = base.map(|value| trim_base(&value));
        self
    }

    /// Replaces the proxy base.
    #[must_use]
    pub fn with_proxy_base(mut self, base: impl Into<String>) -> Self {
        self.proxy_base = trim_base(&base.into());
        self
    }

    /// URL the share page is fetched from.
    #[must_use]
    pub fn page_url(&self, link: &ShareLink) -> String {
        match &self.share_page_base {
            Some(base) => format!("{base}{}", link.path()),
            None => link.as_str().to_string(),
        }
    }

    /// Metadata document URL for `link`, when a metadata API is configured.
    #[must_use]
    pub fn metadata_url(&self, link: &ShareLink) -> Option<String> {
        let base = self.metadata_base.as_ref()?;
        Some(format!("{base}/{}", urlencoding::encode(link.as_str())))
    }

    /// Origin sent to the metadata API.
    #[must_use]
    pub fn metadata_origin(&self) -> Option<&str> {
        self.metadata_origin.as_deref()
    }

    /// Proxy base URL.
    #[must_use]
    pub fn proxy_base(&self) -> &str {
        &self.proxy_base
    }

    /// Proxy transfer URL for an asset and an already-sanitized file name.
    #[must_use]
    pub fn proxy_download_url(&self, asset_id: &AssetId, file_name: &str) -> Option<String> {
        let mut url = self.proxy_endpoint("download")?;
        url.query_pairs_mut()
            .append_pair("id", asset_id.as_str())
            .append_pair("filename", file_name);
        Some(url.into())
    }

    fn proxy_endpoint(&self, name: &str) -> Option<Url> {
        Url::parse(&format!("{}/{name}", self.proxy_base)).ok()
    }
}

fn trim_base(base: &str) -> String {
    base.trim().trim_end_matches('/').to_string()
}

/// Result of one strategy attempt.
#[derive(Debug, Clone)]
pub enum StrategyOutcome {
    /// A target was produced; resolution stops here.
    Resolved(ResolvedTarget),
    /// The strategy did not apply (missing id, disabled); the reason is recorded.
    Skipped(String),
    /// The strategy applied but failed; the next one runs.
    Failed(ResolveError),
}

/// Per-resolve state shared by strategies.
///
/// The page snapshot is fetched lazily by the first strategy that needs it and reused
/// by the rest, so one resolve issues at most one page request.
pub struct ResolveContext<'a> {
    link: &'a ShareLink,
    session: &'a SessionClient,
    endpoints: &'a ResolverEndpoints,
    page: OnceCell<PageSnapshot>,
}

impl<'a> ResolveContext<'a> {
    /// Creates a context for one resolve of `link`.
    #[must_use]
    pub fn new(
        link: &'a ShareLink,
        session: &'a SessionClient,
        endpoints: &'a ResolverEndpoints,
    ) -> Self {
        Self {
            link,
            session,
            endpoints,
            page: OnceCell::new(),
        }
    }

    /// The link being resolved.
    #[must_use]
    pub fn link(&self) -> &ShareLink {
        self.link
    }

    /// Shared HTTP session.
    #[must_use]
    pub fn session(&self) -> &SessionClient {
        self.session
    }

    /// Endpoint configuration.
    #[must_use]
    pub fn endpoints(&self) -> &ResolverEndpoints {
        self.endpoints
    }

    /// Page snapshot, fetched on first use.
    pub async fn page(&self) -> &PageSnapshot {
        self.page
            .get_or_init(|| PageSnapshot::fetch(self.link, self.session, self.endpoints))
            .await
    }

    /// Page snapshot if some strategy already fetched it.
    #[must_use]
    pub fn fetched_page(&self) -> Option<&PageSnapshot> {
        self.page.get()
    }

    /// Asset id from metadata when available, otherwise from the link path.
    pub async fn asset_id(&self) -> Option<AssetId> {
        self.page()
            .await
            .metadata_asset_id()
            .or_else(|| self.link.asset_id().cloned())
    }
}

impl fmt::Debug for ResolveContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolveContext")
            .field("link", &self.link.as_str())
            .field("page_fetched", &self.page.initialized())
            .finish_non_exhaustive()
    }
}

/// A single way of turning a share-link into a transfer target.
///
/// Uses `async_trait` so strategies can live in a `Vec<Box<dyn ResolveStrategy>>`.
#[async_trait]
pub trait ResolveStrategy: Send + Sync {
    /// Stable strategy name used in logs, errors, and [`ResolvedTarget::strategy`].
    fn name(&self) -> &'static str;

    /// Attempts resolution. Never panics; failures are reported in the outcome.
    async fn attempt(&self, link: &ShareLink, ctx: &ResolveContext<'_>) -> StrategyOutcome;
}

/// Construction options for [`build_resolver`].
#[derive(Debug, Clone)]
pub struct ResolverOptions {
    /// Pipeline to run.
    pub mode: ResolverMode,
    /// Remote endpoints.
    pub endpoints: ResolverEndpoints,
    /// Whether the proxy fallback may run.
    pub proxy_fallback: bool,
    /// Where to write the diagnostic page dump; `None` uses the working directory.
    pub diagnostic_dir: Option<PathBuf>,
    /// Program implementing the browser driver protocol.
    pub browser_command: PathBuf,
    /// Browser capture settings.
    pub capture: CaptureOptions,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            mode: ResolverMode::Page,
            endpoints: ResolverEndpoints::default(),
            proxy_fallback: true,
            diagnostic_dir: None,
            browser_command: PathBuf::from(DEFAULT_BROWSER_COMMAND),
            capture: CaptureOptions::default(),
        }
    }
}

/// Builds the resolver for the selected pipeline.
///
/// Page order is fixed: embedded lookup, proxy fallback, degraded lookup.
#[must_use]
pub fn build_resolver(session: SessionClient, options: ResolverOptions) -> Resolver {
    let mut resolver = Resolver::new(session, options.endpoints, options.mode)
        .with_diagnostic_dir(options.diagnostic_dir.unwrap_or_else(|| PathBuf::from(".")));

    match options.mode {
        ResolverMode::Page => {
            resolver.register(Box::new(PageEmbeddedStrategy::new()));
            resolver.register(Box::new(ProxyFallbackStrategy::new(options.proxy_fallback)));
            resolver.register(Box::new(DegradedEmbeddedStrategy::new()));
        }
        ResolverMode::Browser => {
            let driver = Arc::new(CommandBrowserDriver::new(options.browser_command));
            resolver.register(Box::new(BrowserCaptureStrategy::new(driver, options.capture)));
        }
    }
    resolver
}
