//! Third-party proxy fallback.

use async_trait::async_trait;
use tracing::debug;

use crate::download::media_file_name;
use crate::target::ShareLink;

use super::{Quality, ResolveContext, ResolveError, ResolveStrategy, ResolvedTarget, StrategyOutcome};

/// Builds a proxy transfer URL from the asset id.
///
/// The proxy is trusted, not verified, to serve the clean asset; results are marked
/// [`Quality::ProxyFallback`].
#[derive(Debug, Clone, Copy)]
pub struct ProxyFallbackStrategy {
    enabled: bool,
}

impl ProxyFallbackStrategy {
    /// Strategy name.
    pub const NAME: &'static str = "proxy_fallback";

    /// Creates the strategy; a disabled one always skips.
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

#[async_trait]
impl ResolveStrategy for ProxyFallbackStrategy {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn attempt(&self, _link: &ShareLink, ctx: &ResolveContext<'_>) -> StrategyOutcome {
        if !self.enabled {
            return StrategyOutcome::Skipped("disabled by configuration".to_string());
        }

        let Some(asset_id) = ctx.asset_id().await else {
            return StrategyOutcome::Skipped("no asset id in link or metadata".to_string());
        };

        let title = ctx.page().await.title();
        let file_name = media_file_name(title.as_deref());

        match ctx.endpoints().proxy_download_url(&asset_id, &file_name) {
            Some(url) => {
                debug!(asset_id = %asset_id, url = %url, "built proxy transfer URL");
                StrategyOutcome::Resolved(
                    ResolvedTarget::new(url, Quality::ProxyFallback, Self::NAME)
                        .with_asset_id(Some(asset_id)),
                )
            }
            None => StrategyOutcome::Failed(ResolveError::strategy_failed(
                Self::NAME,
                format!("proxy base '{}' is not a valid URL", ctx.endpoints().proxy_base()),
            )),
        }
    }
}
