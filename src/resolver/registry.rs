//! Ordered strategy loop.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::session::SessionClient;
use crate::target::ShareLink;

use super::{
    DIAGNOSTIC_FILE_NAME, ResolveContext, ResolveError, ResolveStrategy, ResolvedTarget,
    ResolverEndpoints, ResolverMode, StrategyAttempt, StrategyOutcome,
};

/// Runs strategies in registration order and returns the first target produced.
pub struct Resolver {
    session: SessionClient,
    endpoints: ResolverEndpoints,
    mode: ResolverMode,
    strategies: Vec<Box<dyn ResolveStrategy>>,
    diagnostic_dir: Option<PathBuf>,
}

impl Resolver {
    /// Creates a resolver with no strategies.
    #[must_use]
    pub fn new(session: SessionClient, endpoints: ResolverEndpoints, mode: ResolverMode) -> Self {
        Self {
            session,
            endpoints,
            mode,
            strategies: Vec::new(),
            diagnostic_dir: None,
        }
    }

    /// Writes the page dump into `dir` when the page pipeline is exhausted.
    #[must_use]
    pub fn with_diagnostic_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.diagnostic_dir = Some(dir.into());
        self
    }

    /// Appends a strategy; earlier registrations run first.
    #[tracing::instrument(skip(self, strategy), fields(strategy_name))]
    pub fn register(&mut self, strategy: Box<dyn ResolveStrategy>) {
        tracing::Span::current().record("strategy_name", strategy.name());
        debug!(name = strategy.name(), "Registering strategy");
        self.strategies.push(strategy);
    }

    /// Number of registered strategies.
    #[must_use]
    pub fn strategy_count(&self) -> usize {
        self.strategies.len()
    }

    /// Names of registered strategies, in order.
    #[must_use]
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Pipeline this resolver runs.
    #[must_use]
    pub fn mode(&self) -> ResolverMode {
        self.mode
    }

    /// Endpoint configuration.
    #[must_use]
    pub fn endpoints(&self) -> &ResolverEndpoints {
        &self.endpoints
    }

    /// Resolves `link` to a transfer target.
    ///
    /// 1. Tries each strategy in order.
    /// 2. `Resolved` returns immediately, after the title and asset id are filled in.
    /// 3. `Skipped` and `Failed` are recorded and the next strategy runs.
    /// 4. When all are exhausted the page body is dumped (page pipeline only).
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::ResolutionExhausted`] when no strategy produced a target.
    #[tracing::instrument(skip(self), fields(link = %link, mode = %self.mode))]
    pub async fn resolve(&self, link: &ShareLink) -> Result<ResolvedTarget, ResolveError> {
        let ctx = ResolveContext::new(link, &self.session, &self.endpoints);
        let mut attempts = Vec::with_capacity(self.strategies.len());

        for strategy in &self.strategies {
            debug!(strategy = strategy.name(), "Trying strategy");

            match strategy.attempt(link, &ctx).await {
                StrategyOutcome::Resolved(target) => {
                    let target = self.complete(target, &ctx).await;
                    if target.quality().is_fallback() {
                        warn!(
                            strategy = target.strategy(),
                            quality = %target.quality(),
                            url = %target.url(),
                            "Resolved to a fallback asset"
                        );
                    } else {
                        info!(
                            strategy = target.strategy(),
                            quality = %target.quality(),
                            url = %target.url(),
                            "Resolution successful"
                        );
                    }
                    return Ok(target);
                }
                StrategyOutcome::Skipped(reason) => {
                    debug!(strategy = strategy.name(), reason = %reason, "Strategy skipped");
                    attempts.push(StrategyAttempt {
                        strategy: strategy.name().to_string(),
                        skipped: true,
                        reason,
                    });
                }
                StrategyOutcome::Failed(err) => {
                    debug!(strategy = strategy.name(), error = %err, "Strategy failed, trying next");
                    let reason = match err {
                        ResolveError::StrategyFailed { reason, .. } => reason,
                        other => other.to_string(),
                    };
                    attempts.push(StrategyAttempt {
                        strategy: strategy.name().to_string(),
                        skipped: false,
                        reason,
                    });
                }
            }
        }

        let diagnostic = match self.mode {
            ResolverMode::Page => self.write_diagnostic(&ctx).await,
            ResolverMode::Browser => None,
        };
        warn!(
            tried = attempts.len(),
            diagnostic = ?diagnostic,
            "All strategies failed"
        );
        Err(ResolveError::exhausted(link.as_str(), attempts, diagnostic))
    }

    async fn complete(&self, target: ResolvedTarget, ctx: &ResolveContext<'_>) -> ResolvedTarget {
        match self.mode {
            ResolverMode::Page => {
                let page = ctx.page().await;
                let title = page.title();
                let asset_id = target
                    .asset_id()
                    .cloned()
                    .or_else(|| page.metadata_asset_id())
                    .or_else(|| ctx.link().asset_id().cloned());
                target.with_suggested_name(title).with_asset_id(asset_id)
            }
            ResolverMode::Browser => {
                if target.asset_id().is_some() {
                    target
                } else {
                    let asset_id = ctx.link().asset_id().cloned();
                    target.with_asset_id(asset_id)
                }
            }
        }
    }

    async fn write_diagnostic(&self, ctx: &ResolveContext<'_>) -> Option<PathBuf> {
        let html = ctx.fetched_page()?.html()?;
        let dir = self.diagnostic_dir.as_deref().unwrap_or_else(|| Path::new("."));
        let path = dir.join(DIAGNOSTIC_FILE_NAME);

        if let Err(err) = tokio::fs::create_dir_all(dir).await {
            warn!(path = %dir.display(), error = %err, "Could not create diagnostic directory");
            return None;
        }
        match tokio::fs::write(&path, html).await {
            Ok(()) => {
                info!(path = %path.display(), bytes = html.len(), "Saved page body for inspection");
                Some(path)
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Could not save page body");
                None
            }
        }
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("mode", &self.mode)
            .field("strategies", &self.strategy_names())
            .field("diagnostic_dir", &self.diagnostic_dir)
            .finish_non_exhaustive()
    }
}
