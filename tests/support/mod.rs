//! Shared helpers for integration tests.

pub mod socket_guard;
pub mod range_server;
