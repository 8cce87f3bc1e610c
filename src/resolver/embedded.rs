//! Strategies that read asset references embedded in the page bodies.

use async_trait::async_trait;
use tracing::debug;

use crate::target::ShareLink;

use super::markers;
use super::{Quality, ResolveContext, ResolveError, ResolveStrategy, ResolvedTarget, StrategyOutcome};

/// Looks for the clean-asset marker in the share page and metadata document.
#[derive(Debug, Default, Clone, Copy)]
pub struct PageEmbeddedStrategy;

impl PageEmbeddedStrategy {
    /// Strategy name.
    pub const NAME: &'static str = "page_embedded";

    /// Creates the strategy.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ResolveStrategy for PageEmbeddedStrategy {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn attempt(&self, _link: &ShareLink, ctx: &ResolveContext<'_>) -> StrategyOutcome {
        lookup(
            ctx,
            Self::NAME,
            markers::NO_WATERMARK_KEY,
            markers::no_watermark_url,
            Quality::Authentic,
        )
        .await
    }
}

/// Looks for the lower-quality downloadable marker; results may carry a watermark.
#[derive(Debug, Default, Clone, Copy)]
pub struct DegradedEmbeddedStrategy;

impl DegradedEmbeddedStrategy {
    /// Strategy name.
    pub const NAME: &'static str = "degraded_embedded";

    /// Creates the strategy.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ResolveStrategy for DegradedEmbeddedStrategy {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn attempt(&self, _link: &ShareLink, ctx: &ResolveContext<'_>) -> StrategyOutcome {
        lookup(
            ctx,
            Self::NAME,
            markers::DOWNLOADABLE_KEY,
            markers::downloadable_url,
            Quality::WatermarkedFallback,
        )
        .await
    }
}

async fn lookup(
    ctx: &ResolveContext<'_>,
    name: &'static str,
    marker: &str,
    extract: fn(&str) -> Option<String>,
    quality: Quality,
) -> StrategyOutcome {
    let page = ctx.page().await;
    if !page.has_body() {
        return StrategyOutcome::Failed(ResolveError::strategy_failed(
            name,
            page.unavailable_reason(),
        ));
    }

    match page.find(extract) {
        Some(url) => {
            debug!(strategy = name, url = %url, "embedded marker found");
            StrategyOutcome::Resolved(ResolvedTarget::new(url, quality, name))
        }
        None => StrategyOutcome::Failed(ResolveError::strategy_failed(
            name,
            format!("no usable \"{marker}\" marker in {}", page.page_url()),
        )),
    }
}
