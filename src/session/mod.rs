//! Shared HTTP session used by the resolver and the transfer engine.
//!
//! [`SessionConfig`] is built once per run and moved into a [`SessionClient`]; both
//! are read-only afterwards, so concurrent transfers may share one client.

mod client;
mod config;
mod error;

pub use client::SessionClient;
pub use config::{
    DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_REQUEST_TIMEOUT_SECS, ImpersonationProfile,
    SessionConfig,
};
pub use error::SessionError;
