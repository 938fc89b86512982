//! Gencache - caching reverse proxy for LLM inference backends
//!
//! This crate intercepts generation requests, answers previously seen
//! requests from a persistent local cache, and forwards genuine misses
//! to the upstream inference server. Requests are fingerprinted with
//! the sample count (`n`) excluded, so a request for three completions
//! can be served from two cached ones plus a single upstream top-up
//! (a partial fill).
//!
//! Two request dialects are accepted, the backend's native `/generate`
//! shape and the OpenAI-style completion/chat shapes, and both share
//! one cache.
//!
//! # Embedding example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use gencache::cache::CacheEngine;
//! use gencache::server::{AppState, router};
//! use gencache::upstream::HttpUpstream;
//!
//! #[tokio::main]
//! async fn main() -> gencache::Result<()> {
//!     let engine = Arc::new(CacheEngine::open("/tmp/gencache".as_ref(), false)?);
//!     let upstream = Arc::new(HttpUpstream::new(
//!         "http://127.0.0.1:30000",
//!         Duration::from_secs(300),
//!     )?);
//!
//!     let app = router(AppState { engine: Arc::clone(&engine), upstream });
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:30001").await?;
//!     axum::serve(listener, app).await?;
//!
//!     engine.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! # Cache-only example
//!
//! ```rust,ignore
//! use gencache::cache::CacheEngine;
//! use gencache::types::GenerateRequest;
//!
//! let engine = CacheEngine::open("/tmp/gencache".as_ref(), false)?;
//! let request = GenerateRequest::from_value(serde_json::json!({
//!     "text": "Once upon a time",
//!     "sampling_params": {"temperature": 0.0, "n": 3}
//! }))?;
//!
//! let lookup = engine.lookup(&request)?;
//! println!("{} cached, {} needed", lookup.cached.len(), lookup.needed);
//! ```

pub mod cache;
pub mod dialect;
pub mod error;
pub mod fingerprint;
pub mod server;
pub mod telemetry;
pub mod types;
pub mod upstream;
pub mod version;

// Re-export main types at crate root
pub use cache::{CacheEngine, CacheStats, Lookup};
pub use error::{GencacheError, Result};
pub use fingerprint::Fingerprint;

// Re-export version info
pub use version::{GIT_BRANCH, GIT_SHA, PKG_VERSION, git_dirty, version_string};

// Re-export request/response types
pub use types::{ChatMessage, Completion, GenerateRequest, Prompt, Role};
