//! Constants for the transfer engine.

/// Upper bound on bytes appended to the staging file per write.
pub const CHUNK_SIZE: usize = 32 * 1024;

/// Suffix appended to the target path while a transfer is incomplete.
pub const STAGING_SUFFIX: &str = ".partial";

/// Extension of committed media files.
pub const MEDIA_EXTENSION: &str = "mp4";
