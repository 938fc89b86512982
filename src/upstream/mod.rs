//! Upstream backend client.
//!
//! The inference server is a black box behind `POST <base>/generate`.
//! [`CompletionBackend`] is the seam the proxy pipeline talks through;
//! [`HttpUpstream`] is the real reqwest-backed implementation, and
//! tests substitute their own.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::telemetry;
use crate::types::{Completion, GenerateRequest};
use crate::{GencacheError, Result};

/// How much of an upstream error body survives into diagnostics.
const MAX_DIAGNOSTIC_LEN: usize = 200;

/// A backend that can produce completions for a native-dialect request.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Generate completions, normalized to a list.
    ///
    /// The caller has already set `n` to the number of completions it
    /// wants; implementations return however many the backend produced
    /// (the pipeline enforces the count).
    async fn generate(&self, request: &GenerateRequest) -> Result<Vec<Completion>>;

    /// Liveness probe against the backend.
    async fn health(&self) -> Result<()>;
}

/// HTTP client for the native `/generate` endpoint.
pub struct HttpUpstream {
    base_url: String,
    client: reqwest::Client,
}

impl HttpUpstream {
    /// Create a client for the backend at `base_url` with the given
    /// per-request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GencacheError::Configuration(format!("HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl CompletionBackend for HttpUpstream {
    async fn generate(&self, request: &GenerateRequest) -> Result<Vec<Completion>> {
        metrics::counter!(telemetry::UPSTREAM_REQUESTS_TOTAL).increment(1);
        let response = self
            .client
            .post(format!("{}/generate", self.base_url))
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GencacheError::UpstreamProtocol {
                status: status.as_u16(),
                message: truncate_diagnostic(&body),
            });
        }

        let value: Value = response.json().await.map_err(|e| {
            GencacheError::UpstreamProtocol {
                status: status.as_u16(),
                message: format!("invalid JSON body: {e}"),
            }
        })?;
        let completions = normalize_completions(value)?;
        debug!(count = completions.len(), "upstream generated");
        Ok(completions)
    }

    async fn health(&self) -> Result<()> {
        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(GencacheError::UpstreamProtocol {
                status: status.as_u16(),
                message: "health probe failed".to_string(),
            })
        }
    }
}

/// The backend answers `n=1` requests with a bare object and larger
/// requests with an array; either way the pipeline works on a list.
fn normalize_completions(value: Value) -> Result<Vec<Completion>> {
    match value {
        Value::Array(items) => Ok(items.into_iter().map(Completion::new).collect()),
        value @ Value::Object(_) => Ok(vec![Completion::new(value)]),
        other => Err(GencacheError::UpstreamProtocol {
            status: 200,
            message: format!("expected object or array, got {}", json_kind(&other)),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn truncate_diagnostic(body: &str) -> String {
    if body.len() <= MAX_DIAGNOSTIC_LEN {
        body.to_string()
    } else {
        let mut end = MAX_DIAGNOSTIC_LEN;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}…", &body[..end])
    }
}
