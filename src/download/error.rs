//! Error types for the transfer engine.
//!
//! Every variant that can follow partial progress carries `bytes_secured`: the number
//! of bytes sitting in the staging file, available to a later resume.

use std::path::PathBuf;

use thiserror::Error;

use crate::session::SessionError;

/// Errors that can occur while transferring a resolved target to disk.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The transfer stopped before the final file was committed.
    #[error("transfer of {url} interrupted with {bytes_secured} bytes secured: {cause}")]
    Interrupted {
        /// The target URL.
        url: String,
        /// Staging file holding the secured bytes (removed when empty).
        staging_path: PathBuf,
        /// Bytes present in the staging file.
        bytes_secured: u64,
        /// What stopped the transfer.
        #[source]
        cause: InterruptCause,
    },

    /// The partial file and the server disagree about where the resume starts.
    ///
    /// The engine recovers from this once by restarting from zero; it is only returned
    /// when the fresh attempt hits it as well.
    #[error(
        "resume state for {path} is inconsistent: {detail}\n  Suggestion: delete the partial file and run again without resume"
    )]
    CorruptResumeState {
        /// Staging path whose contents could not be resumed.
        path: PathBuf,
        /// Bytes the staging file held when the mismatch was detected.
        bytes_done: u64,
        /// Human-readable mismatch description.
        detail: String,
    },

    /// File system error while creating, writing, syncing, or renaming.
    #[error("IO error at {path}: {source}")]
    Io {
        /// The path where the error occurred.
        path: PathBuf,
        /// Bytes present in the staging file when the error occurred.
        bytes_secured: u64,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Reason an [`TransferError::Interrupted`] transfer stopped.
#[derive(Debug, Error)]
pub enum InterruptCause {
    /// Request, status, or body-read failure reported by the session client.
    #[error(transparent)]
    Session(SessionError),

    /// The body ended with a byte count different from the declared total.
    #[error("received {received} bytes but {expected} were declared")]
    LengthMismatch {
        /// Declared total size.
        expected: u64,
        /// Bytes actually present after the body ended.
        received: u64,
    },
}

impl TransferError {
    /// Creates an interruption caused by a session error.
    pub fn interrupted(
        url: impl Into<String>,
        staging_path: impl Into<PathBuf>,
        bytes_secured: u64,
        source: SessionError,
    ) -> Self {
        Self::Interrupted {
            url: url.into(),
            staging_path: staging_path.into(),
            bytes_secured,
            cause: InterruptCause::Session(source),
        }
    }

    /// Creates an interruption caused by a short or overlong body.
    pub fn length_mismatch(
        url: impl Into<String>,
        staging_path: impl Into<PathBuf>,
        expected: u64,
        received: u64,
    ) -> Self {
        Self::Interrupted {
            url: url.into(),
            staging_path: staging_path.into(),
            bytes_secured: received,
            cause: InterruptCause::LengthMismatch { expected, received },
        }
    }

    /// Creates a corrupt-resume error.
    pub fn corrupt_resume(
        path: impl Into<PathBuf>,
        bytes_done: u64,
        detail: impl Into<String>,
    ) -> Self {
        Self::CorruptResumeState {
            path: path.into(),
            bytes_done,
            detail: detail.into(),
        }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, bytes_secured: u64, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            bytes_secured,
            source,
        }
    }

    /// Bytes preserved on disk for a later resume.
    #[must_use]
    pub fn bytes_secured(&self) -> u64 {
        match self {
            Self::Interrupted { bytes_secured, .. } | Self::Io { bytes_secured, .. } => {
                *bytes_secured
            }
            Self::CorruptResumeState { .. } => 0,
        }
    }

    /// HTTP status that ended the transfer, if any.
    #[must_use]
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::Interrupted {
                cause: InterruptCause::Session(SessionError::HttpStatus { status, .. }),
                ..
            } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_interrupted_display_reports_bytes_secured() {
        let err = TransferError::interrupted(
            "https://cdn.example/v.mp4",
            "/tmp/v.mp4.partial",
            4096,
            SessionError::http_status("https://cdn.example/v.mp4", 503),
        );
        let msg = err.to_string();
        assert!(msg.contains("4096 bytes secured"), "got: {msg}");
        assert!(msg.contains("https://cdn.example/v.mp4"));
        assert_eq!(err.bytes_secured(), 4096);
        assert_eq!(err.http_status(), Some(503));
    }

    #[test]
    fn test_length_mismatch_secures_received_bytes() {
        let err = TransferError::length_mismatch("u", "/tmp/x.partial", 100, 60);
        assert_eq!(err.bytes_secured(), 60);
        assert!(err.to_string().contains("received 60 bytes but 100"));
        assert_eq!(err.http_status(), None);
    }

    #[test]
    fn test_corrupt_resume_has_suggestion() {
        let err = TransferError::corrupt_resume("/tmp/x.partial", 10, "HTTP 416");
        let msg = err.to_string();
        assert!(msg.contains("Suggestion:"));
        assert!(msg.contains("HTTP 416"));
        assert_eq!(err.bytes_secured(), 0);
    }

    #[test]
    fn test_io_display_contains_path() {
        let source = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = TransferError::io("/readonly/out.mp4", 0, source);
        assert!(err.to_string().contains("/readonly/out.mp4"));
    }
}
