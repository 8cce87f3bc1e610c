//! End-to-end fetch: normalize, resolve, transfer.
//!
//! [`Fetcher`] wires a [`ShareLinkPattern`], a [`Resolver`], and a [`TransferEngine`]
//! together and reports failures by stage through [`PipelineError`].

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, instrument};

use crate::download::{TransferEngine, TransferError, TransferOutcome};
use crate::resolver::{ResolveError, ResolvedTarget, Resolver};
use crate::target::{ShareLink, ShareLinkPattern, TargetError};

/// Stage of the pipeline an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Share-link validation.
    Normalize,
    /// Strategy resolution.
    Resolve,
    /// Byte transfer to disk.
    Transfer,
}

impl Stage {
    /// Stable lowercase label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normalize => "normalize",
            Self::Resolve => "resolve",
            Self::Transfer => "transfer",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse failure category reported to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The input is not a recognized share-link.
    InvalidTarget,
    /// No strategy produced a target.
    ResolutionExhausted,
    /// Connection failure or timeout.
    NetworkError,
    /// Non-success HTTP status.
    HttpStatusError,
    /// Partial file and server disagree, even after a fresh restart.
    CorruptResumeState,
    /// Local file could not be created, written, or renamed.
    FilesystemError,
}

impl ErrorKind {
    /// Stable label used in CLI output.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidTarget => "InvalidTarget",
            Self::ResolutionExhausted => "ResolutionExhausted",
            Self::NetworkError => "NetworkError",
            Self::HttpStatusError => "HttpStatusError",
            Self::CorruptResumeState => "CorruptResumeState",
            Self::FilesystemError => "FilesystemError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failure in one of the pipeline stages.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The input was rejected before any network activity.
    #[error(transparent)]
    Normalize(TargetError),

    /// Every strategy was tried without success.
    #[error(transparent)]
    Resolve(ResolveError),

    /// The transfer stopped before the file was committed.
    #[error(transparent)]
    Transfer(TransferError),
}

impl PipelineError {
    /// Stage that failed.
    #[must_use]
    pub fn stage(&self) -> Stage {
        match self {
            Self::Normalize(_) => Stage::Normalize,
            Self::Resolve(_) => Stage::Resolve,
            Self::Transfer(_) => Stage::Transfer,
        }
    }

    /// Failure category.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Normalize(_) => ErrorKind::InvalidTarget,
            Self::Resolve(_) => ErrorKind::ResolutionExhausted,
            Self::Transfer(err) => match err {
                TransferError::Interrupted { .. } if err.http_status().is_some() => {
                    ErrorKind::HttpStatusError
                }
                TransferError::Interrupted { .. } => ErrorKind::NetworkError,
                TransferError::CorruptResumeState { .. } => ErrorKind::CorruptResumeState,
                TransferError::Io { .. } => ErrorKind::FilesystemError,
            },
        }
    }

    /// Bytes left in the staging file for a later resume (0 outside the transfer stage).
    #[must_use]
    pub fn bytes_secured(&self) -> u64 {
        match self {
            Self::Transfer(err) => err.bytes_secured(),
            Self::Normalize(_) | Self::Resolve(_) => 0,
        }
    }
}

/// Where a transferred asset is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Directory; the file is named after the sanitized title.
    Directory(PathBuf),
    /// Exact output path.
    File(PathBuf),
}

impl Destination {
    /// Treats `path` as a file when it carries an extension and is not an existing
    /// directory.
    #[must_use]
    pub fn infer(path: &Path) -> Self {
        if path.extension().is_some() && !path.is_dir() {
            Self::File(path.to_path_buf())
        } else {
            Self::Directory(path.to_path_buf())
        }
    }
}

/// Result of one successful fetch.
#[derive(Debug, Clone)]
pub struct FetchReport {
    /// Normalized share-link.
    pub link: ShareLink,
    /// Target the resolver picked.
    pub target: ResolvedTarget,
    /// Transfer summary.
    pub outcome: TransferOutcome,
}

/// Normalizes, resolves, and transfers share-links.
#[derive(Debug)]
pub struct Fetcher {
    pattern: ShareLinkPattern,
    resolver: Resolver,
    engine: TransferEngine,
}

impl Fetcher {
    /// Creates a fetcher.
    #[must_use]
    pub fn new(pattern: ShareLinkPattern, resolver: Resolver, engine: TransferEngine) -> Self {
        Self {
            pattern,
            resolver,
            engine,
        }
    }

    /// Resolver in use.
    #[must_use]
    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Normalizes and resolves `input` without transferring anything.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Normalize`] or [`PipelineError::Resolve`].
    #[instrument(skip(self))]
    pub async fn inspect(&self, input: &str) -> Result<(ShareLink, ResolvedTarget), PipelineError> {
        let link = self
            .pattern
            .normalize(input)
            .map_err(PipelineError::Normalize)?;
        let target = self
            .resolver
            .resolve(&link)
            .await
            .map_err(PipelineError::Resolve)?;
        Ok((link, target))
    }

    /// Runs the whole pipeline for `input`.
    ///
    /// # Errors
    ///
    /// Any stage failure, wrapped in [`PipelineError`].
    #[instrument(skip(self, destination))]
    pub async fn fetch(
        &self,
        input: &str,
        destination: &Destination,
        resume: bool,
    ) -> Result<FetchReport, PipelineError> {
        let (link, target) = self.inspect(input).await?;

        let outcome = match destination {
            Destination::Directory(dir) => self.engine.transfer(target.clone(), dir, resume).await,
            Destination::File(path) => {
                self.engine
                    .transfer_to_path(target.clone(), path, resume)
                    .await
            }
        }
        .map_err(PipelineError::Transfer)?;

        info!(
            link = %link,
            path = %outcome.path.display(),
            bytes = outcome.bytes_written,
            quality = %target.quality(),
            "fetch complete"
        );
        Ok(FetchReport {
            link,
            target,
            outcome,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::resolver::StrategyAttempt;
    use crate::session::SessionError;

    #[test]
    fn test_normalize_failure_is_invalid_target() {
        let err = PipelineError::Normalize(TargetError::invalid("x", "not a URL", "https://h/p/"));
        assert_eq!(err.stage(), Stage::Normalize);
        assert_eq!(err.kind(), ErrorKind::InvalidTarget);
        assert_eq!(err.bytes_secured(), 0);
    }

    #[test]
    fn test_resolve_failure_is_exhausted() {
        let attempts = vec![StrategyAttempt {
            strategy: "page_embedded".into(),
            skipped: false,
            reason: "no marker".into(),
        }];
        let err = PipelineError::Resolve(ResolveError::exhausted("https://h/p/x", attempts, None));
        assert_eq!(err.stage().as_str(), "resolve");
        assert_eq!(err.kind(), ErrorKind::ResolutionExhausted);
    }

    #[test]
    fn test_transfer_kinds() {
        let status = PipelineError::Transfer(TransferError::interrupted(
            "https://cdn.example/v.mp4",
            "/tmp/v.mp4.partial",
            10,
            SessionError::http_status("https://cdn.example/v.mp4", 503),
        ));
        assert_eq!(status.kind(), ErrorKind::HttpStatusError);
        assert_eq!(status.bytes_secured(), 10);

        let network = PipelineError::Transfer(TransferError::interrupted(
            "https://cdn.example/v.mp4",
            "/tmp/v.mp4.partial",
            7,
            SessionError::Timeout {
                url: "https://cdn.example/v.mp4".into(),
            },
        ));
        assert_eq!(network.kind(), ErrorKind::NetworkError);

        let short = PipelineError::Transfer(TransferError::length_mismatch(
            "https://cdn.example/v.mp4",
            "/tmp/v.mp4.partial",
            100,
            40,
        ));
        assert_eq!(short.kind(), ErrorKind::NetworkError);
        assert_eq!(short.bytes_secured(), 40);

        let corrupt = PipelineError::Transfer(TransferError::corrupt_resume(
            "/tmp/v.mp4.partial",
            5,
            "416",
        ));
        assert_eq!(corrupt.kind(), ErrorKind::CorruptResumeState);

        let io = PipelineError::Transfer(TransferError::io(
            "/readonly/v.mp4",
            0,
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        ));
        assert_eq!(io.kind(), ErrorKind::FilesystemError);
        assert_eq!(io.stage(), Stage::Transfer);
    }

    #[test]
    fn test_destination_infer() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            Destination::infer(dir.path()),
            Destination::Directory(dir.path().to_path_buf())
        );
        let file = dir.path().join("clip.mp4");
        assert_eq!(Destination::infer(&file), Destination::File(file.clone()));
        assert_eq!(
            Destination::infer(Path::new("videos")),
            Destination::Directory(PathBuf::from("videos"))
        );
    }
}
