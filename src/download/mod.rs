//! Resumable transfer of resolved targets to local storage.
//!
//! Bytes stream into `<target>.partial` and the file is renamed to its final name
//! only once complete, so a reader never sees a half-written `.mp4`.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use clipfetch_core::download::TransferEngine;
//! use clipfetch_core::resolver::{Quality, ResolvedTarget};
//! use clipfetch_core::session::{SessionClient, SessionConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = TransferEngine::new(SessionClient::new(SessionConfig::new())?);
//! let target = ResolvedTarget::new("https://cdn.example/v.mp4", Quality::Authentic, "manual")
//!     .with_suggested_name(Some("My clip".to_string()));
//! let outcome = engine.transfer(target, Path::new("./videos"), true).await?;
//! println!("saved {} ({} bytes)", outcome.path.display(), outcome.bytes_written);
//! # Ok(())
//! # }
//! ```

mod constants;
mod engine;
mod error;
mod filename;
mod progress;

pub use constants::{CHUNK_SIZE, MEDIA_EXTENSION, STAGING_SUFFIX};
pub use engine::{TransferEngine, TransferOutcome, TransferState};
pub use error::{InterruptCause, TransferError};
pub use filename::{MAX_FILENAME_CHARS, PLACEHOLDER, media_file_name, sanitize, staging_path_for};
pub use progress::{NoopObserver, ProgressObserver, TransferProgress};
