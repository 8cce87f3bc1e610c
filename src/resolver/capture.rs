//! Browser-capture strategy: network interception with a rendered-DOM fallback.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use scraper::{Html, Selector};
use tracing::{debug, warn};
use url::Url;

use crate::target::ShareLink;

use super::markers;
use super::{
    BrowserCapture, BrowserDriver, CaptureOptions, Quality, ResolveContext, ResolveError,
    ResolveStrategy, ResolvedTarget, StrategyOutcome,
};

/// Host fragment of the canonical asset CDN.
pub const ASSET_HOST: &str = "cdn.openai.com";

/// Path fragment identifying source renditions on the asset CDN.
pub const ASSET_PATH: &str = "/MP4/";

// Document titles containing this are the bare site name, not the post title.
const SITE_NAME_MARKER: &str = "sora";

const MEDIA_SELECTORS: [&str; 4] = [
    "video source",
    "video[src]",
    "source[type='video/mp4']",
    "[data-video-url]",
];

static MEDIA_SELECTOR_SET: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    MEDIA_SELECTORS
        .iter()
        .filter_map(|raw| Selector::parse(raw).ok())
        .collect()
});

static H1_SELECTOR: LazyLock<Option<Selector>> = LazyLock::new(|| Selector::parse("h1").ok());

/// Loads the share page through a [`BrowserDriver`] and picks the asset URL.
///
/// Intercepted requests matching the canonical asset pattern are
/// [`Quality::Authentic`]. A DOM-scanned source is only `Authentic` when it also
/// matches that pattern; any other player source is
/// [`Quality::WatermarkedFallback`].
pub struct BrowserCaptureStrategy {
    driver: Arc<dyn BrowserDriver>,
    options: CaptureOptions,
}

impl BrowserCaptureStrategy {
    /// Strategy name.
    pub const NAME: &'static str = "browser_capture";

    /// Creates the strategy.
    #[must_use]
    pub fn new(driver: Arc<dyn BrowserDriver>, options: CaptureOptions) -> Self {
        Self { driver, options }
    }
}

impl std::fmt::Debug for BrowserCaptureStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrowserCaptureStrategy")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ResolveStrategy for BrowserCaptureStrategy {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn attempt(&self, link: &ShareLink, ctx: &ResolveContext<'_>) -> StrategyOutcome {
        let page_url = ctx.endpoints().page_url(link);
        let capture = match self.driver.capture(&page_url, &self.options).await {
            Ok(capture) => capture,
            Err(err) => {
                warn!(error = %err, "browser capture failed");
                return StrategyOutcome::Failed(ResolveError::strategy_failed(
                    Self::NAME,
                    err.to_string(),
                ));
            }
        };

        let Some((url, quality)) = pick_asset(&capture, &page_url) else {
            return StrategyOutcome::Failed(ResolveError::strategy_failed(
                Self::NAME,
                format!(
                    "no media request among {} intercepted and no media element in the rendered page",
                    capture.requests.len()
                ),
            ));
        };

        StrategyOutcome::Resolved(
            ResolvedTarget::new(url, quality, Self::NAME).with_suggested_name(rendered_title(&capture)),
        )
    }
}

/// True when `url` points at a source rendition on the asset CDN.
#[must_use]
pub fn is_primary_asset_url(url: &str) -> bool {
    url.contains(ASSET_HOST) && url.contains(ASSET_PATH)
}

fn is_secondary_asset_url(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    lower.contains(SITE_NAME_MARKER) && lower.contains(".mp4")
}

fn pick_asset(capture: &BrowserCapture, page_url: &str) -> Option<(String, Quality)> {
    if let Some(url) = capture.requests.iter().find(|u| is_primary_asset_url(u)) {
        debug!(url = %url, "captured primary asset request");
        return Some((url.clone(), Quality::Authentic));
    }
    if let Some(url) = capture.requests.iter().find(|u| is_secondary_asset_url(u)) {
        debug!(url = %url, "captured secondary asset request");
        return Some((url.clone(), Quality::Authentic));
    }

    let html = capture.html.as_deref()?;
    let found = scan_dom(html, page_url)?;
    let quality = if is_primary_asset_url(&found) {
        Quality::Authentic
    } else {
        Quality::WatermarkedFallback
    };
    debug!(url = %found, quality = %quality, "media element found in rendered page");
    Some((found, quality))
}

/// First media reference in the rendered DOM, resolved against `page_url`.
#[must_use]
pub fn scan_dom(html: &str, page_url: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let base = Url::parse(page_url).ok();

    for selector in MEDIA_SELECTOR_SET.iter() {
        for element in document.select(selector) {
            let value = element.value();
            let Some(raw) = value.attr("src").or_else(|| value.attr("data-video-url")) else {
                continue;
            };
            let raw = raw.trim();
            if !(raw.contains(ASSET_HOST) || raw.to_ascii_lowercase().contains(".mp4")) {
                continue;
            }
            let absolute = match &base {
                Some(base) => base.join(raw).map(String::from).ok(),
                None => Url::parse(raw).map(String::from).ok(),
            };
            if absolute.is_some() {
                return absolute;
            }
        }
    }
    None
}

/// Title from the rendered page: `og:title`, then `<title>` unless it is only the
/// site name, then the first `<h1>`.
fn rendered_title(capture: &BrowserCapture) -> Option<String> {
    let html = capture.html.as_deref();

    if let Some(title) = html.and_then(markers::og_title) {
        return Some(title);
    }

    let document_title = capture
        .title
        .clone()
        .or_else(|| html.and_then(markers::document_title));
    if let Some(title) = document_title
        && !title.to_ascii_lowercase().contains(SITE_NAME_MARKER)
    {
        return Some(title);
    }

    let selector = H1_SELECTOR.as_ref()?;
    let document = Html::parse_document(html?);
    document
        .select(selector)
        .map(|element| element.text().collect::<String>().trim().to_string())
        .find(|text| !text.is_empty())
}
