//! HTTP server: configuration, routing, and the proxy pipeline.
//!
//! The binary wires a [`CacheEngine`](crate::cache::CacheEngine) and an
//! [`HttpUpstream`](crate::upstream::HttpUpstream) into an
//! [`AppState`], builds the [`router`], and serves it with axum. The
//! same router is exercised directly by the integration tests against
//! an ephemeral listener.

pub mod config;
pub mod routes;

pub use config::Config;
pub use routes::{AppState, router};
