//! clipfetch core library
//!
//! Resolves video share-links to the best available source asset and transfers it to
//! disk with resume support.
//!
//! # Architecture
//!
//! - [`target`] - share-link validation and asset id extraction
//! - [`session`] - impersonating HTTP session shared by every request
//! - [`resolver`] - ordered resolution strategies (page, proxy, browser capture)
//! - [`download`] - resumable, atomic transfer engine and filename sanitizer
//! - [`pipeline`] - normalize, resolve, transfer, with errors reported by stage

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod download;
pub mod pipeline;
pub mod resolver;
pub mod session;
pub mod target;
#[cfg(test)]
pub mod test_support;
pub(crate) mod user_agent;

// Re-export commonly used types
pub use download::{TransferEngine, TransferError, TransferOutcome, sanitize};
pub use pipeline::{Destination, ErrorKind, FetchReport, Fetcher, PipelineError, Stage};
pub use resolver::{Quality, ResolveError, ResolvedTarget, Resolver, ResolverMode, build_resolver};
pub use session::{ImpersonationProfile, SessionClient, SessionConfig, SessionError};
pub use target::{AssetId, ShareLink, ShareLinkPattern, TargetError};
