//! Effective run settings: CLI flags over config file over built-in defaults.

use std::path::PathBuf;
use std::time::Duration;

use clipfetch_core::pipeline::Destination;
use clipfetch_core::resolver::{
    CaptureOptions, DEFAULT_BROWSER_COMMAND, ResolverEndpoints, ResolverMode, ResolverOptions,
};
use clipfetch_core::session::{
    DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_REQUEST_TIMEOUT_SECS, SessionConfig,
};
use clipfetch_core::target::{DEFAULT_PATH_MARKER, ShareLinkPattern};

use crate::app_config::FileConfig;
use crate::cli::Args;

/// Everything `main` needs to build the fetcher for one run.
#[derive(Debug, Clone)]
pub(crate) struct RunSettings {
    pub session: SessionConfig,
    pub resolver: ResolverOptions,
    pub pattern: ShareLinkPattern,
    pub output_dir: PathBuf,
    pub output: Option<PathBuf>,
    pub resume: bool,
    pub info_only: bool,
}

impl RunSettings {
    /// Merges `args` over `file`.
    pub(crate) fn merge(args: &Args, file: &FileConfig) -> Self {
        let profile = args.profile.or(file.profile).unwrap_or_default();
        let proxy = args.proxy.clone().or_else(|| file.proxy.clone());
        let request_timeout = Duration::from_secs(
            args.timeout
                .or(file.timeout_secs)
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        );
        let connect_timeout = Duration::from_secs(
            file.connect_timeout_secs
                .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
        );

        let session = SessionConfig::new()
            .with_profile(profile)
            .with_auth_cookie(args.cookie.clone().or_else(|| file.cookie.clone()))
            .with_proxy(proxy.clone())
            .with_connect_timeout(connect_timeout)
            .with_request_timeout(request_timeout);

        let mut endpoints = ResolverEndpoints::default();
        if let Some(base) = &file.metadata_base {
            endpoints = endpoints.with_metadata_base(Some(base.clone()));
        }
        if let Some(base) = &file.proxy_base {
            endpoints = endpoints.with_proxy_base(base.clone());
        }

        let mut capture = CaptureOptions {
            headless: !args.visible,
            proxy,
            user_agent: Some(profile.user_agent()),
            ..CaptureOptions::default()
        };
        if let Some(secs) = args.timeout {
            capture.timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = args.settle_ms.or(file.settle_ms) {
            capture.settle = Duration::from_millis(ms);
        }

        let output_dir = args
            .output_dir
            .clone()
            .or_else(|| file.output_dir.clone())
            .unwrap_or_else(|| PathBuf::from("."));

        let resolver = ResolverOptions {
            mode: args.pipeline.or(file.pipeline).unwrap_or(ResolverMode::Page),
            endpoints,
            proxy_fallback: !args.no_proxy_fallback && file.proxy_fallback.unwrap_or(true),
            diagnostic_dir: Some(output_dir.clone()),
            browser_command: args
                .browser_command
                .clone()
                .or_else(|| file.browser_command.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_BROWSER_COMMAND)),
            capture,
        };

        let pattern = file
            .share_host
            .as_deref()
            .map_or_else(ShareLinkPattern::default, |host| {
                ShareLinkPattern::new(host, DEFAULT_PATH_MARKER)
            });

        Self {
            session,
            resolver,
            pattern,
            output_dir,
            output: args.output.clone(),
            resume: !args.no_resume,
            info_only: args.info_only,
        }
    }

    /// Destination for a batch of `link_count` links.
    ///
    /// `-o` names a file only when exactly one link is fetched.
    pub(crate) fn destination(&self, link_count: usize) -> Destination {
        match &self.output {
            Some(path) if link_count == 1 => Destination::infer(path),
            Some(path) => Destination::Directory(path.clone()),
            None => Destination::Directory(self.output_dir.clone()),
        }
    }
}
