//! HTTP surface and the proxy request pipeline.
//!
//! Every generation endpoint runs the same path: decode → translate to
//! native → cache lookup → upstream top-up for whatever the cache
//! couldn't supply → store → merge → re-shape for the inbound dialect.
//! The cache engine and upstream client arrive through [`AppState`];
//! handlers never reach for globals.

use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

use crate::cache::CacheEngine;
use crate::dialect::openai::{
    ChatCompletionRequest, CompletionRequest, chat_completion_response, completion_response,
};
use crate::telemetry;
use crate::types::{Completion, GenerateRequest};
use crate::upstream::CompletionBackend;
use crate::GencacheError;

/// Shared state handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<CacheEngine>,
    pub upstream: Arc<dyn CompletionBackend>,
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/generate", post(generate))
        .route("/v1/completions", post(completions))
        .route("/v1/chat/completions", post(chat_completions))
        .route("/cache/stats", get(cache_stats))
        .route("/cache/clear", post(cache_clear))
        .route("/cache/info", get(cache_info))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Error response: taxonomy mapped onto status codes, body
/// `{"error": <message>}`.
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl From<GencacheError> for ApiError {
    fn from(err: GencacheError) -> Self {
        let status = match &err {
            GencacheError::Malformed(_) => StatusCode::BAD_REQUEST,
            GencacheError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            GencacheError::UpstreamUnavailable(_) | GencacheError::UpstreamProtocol { .. } => {
                StatusCode::BAD_GATEWAY
            }
            GencacheError::Json(_) | GencacheError::Configuration(_) | GencacheError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        if status == StatusCode::BAD_GATEWAY {
            warn!(error = %err, "upstream failure");
        } else {
            debug!(error = %err, "request rejected");
        }
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, axum::Json(json!({"error": self.message}))).into_response()
    }
}

/// Native-dialect generation.
async fn generate(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<axum::Json<Value>, ApiError> {
    metrics::counter!(telemetry::REQUESTS_TOTAL, "endpoint" => "generate").increment(1);
    let request = GenerateRequest::from_value(parse_body(&body)?)?;
    request.validate()?;

    let n = request.requested_n();
    let merged = run_pipeline(&state, &request).await?;

    // the backend's own convention: bare object for a single
    // completion, array otherwise
    let body = if n == 1 {
        serde_json::to_value(&merged[0]).map_err(GencacheError::from)?
    } else {
        serde_json::to_value(&merged).map_err(GencacheError::from)?
    };
    Ok(axum::Json(body))
}

/// OpenAI-style text completion.
async fn completions(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<axum::Json<Value>, ApiError> {
    metrics::counter!(telemetry::REQUESTS_TOTAL, "endpoint" => "completions").increment(1);
    let request = CompletionRequest::from_value(parse_body(&body)?)?;
    let native = request.to_native();
    native.validate()?;

    let merged = run_pipeline(&state, &native).await?;
    Ok(axum::Json(completion_response(
        &merged,
        native.model.as_deref(),
    )))
}

/// OpenAI-style chat completion.
async fn chat_completions(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<axum::Json<Value>, ApiError> {
    metrics::counter!(telemetry::REQUESTS_TOTAL, "endpoint" => "chat").increment(1);
    let request = ChatCompletionRequest::from_value(parse_body(&body)?)?;
    let native = request.to_native();
    native.validate()?;

    let merged = run_pipeline(&state, &native).await?;
    Ok(axum::Json(chat_completion_response(
        &merged,
        native.model.as_deref(),
    )))
}

async fn cache_stats(State(state): State<AppState>) -> axum::Json<Value> {
    axum::Json(json!(state.engine.stats()))
}

async fn cache_clear(State(state): State<AppState>) -> axum::Json<Value> {
    state.engine.clear().await;
    axum::Json(json!({"cleared": true}))
}

async fn cache_info(State(state): State<AppState>) -> axum::Json<Value> {
    let mut info = json!(state.engine.stats());
    info["cache_file"] = json!(state.engine.cache_file().display().to_string());
    axum::Json(info)
}

async fn health() -> axum::Json<Value> {
    axum::Json(json!({"status": "ok"}))
}

fn parse_body(body: &Bytes) -> Result<Value, ApiError> {
    serde_json::from_slice(body)
        .map_err(|e| GencacheError::Malformed(format!("invalid JSON body: {e}")).into())
}

/// The cache-then-upstream pipeline shared by all generation
/// endpoints.
///
/// Returns exactly `n` completions: the cached snapshot first, then
/// whatever the upstream produced for the remainder. The snapshot is
/// immune to concurrent stores, so the merge length is exact even when
/// identical requests race.
async fn run_pipeline(
    state: &AppState,
    request: &GenerateRequest,
) -> Result<Vec<Completion>, ApiError> {
    let lookup = state.engine.lookup(request)?;
    if lookup.needed == 0 {
        return Ok(lookup.cached);
    }

    let upstream_request = request.with_n(lookup.needed);
    let mut fresh = state.upstream.generate(&upstream_request).await?;

    if fresh.len() < lookup.needed {
        return Err(GencacheError::UpstreamProtocol {
            status: 200,
            message: format!(
                "upstream returned {} completions, requested {}",
                fresh.len(),
                lookup.needed
            ),
        }
        .into());
    }
    if fresh.len() > lookup.needed {
        warn!(
            returned = fresh.len(),
            requested = lookup.needed,
            "upstream returned extra completions; truncating"
        );
        fresh.truncate(lookup.needed);
    }

    state.engine.store(&lookup.fingerprint, &fresh);

    let mut merged = lookup.cached;
    merged.extend(fresh);
    Ok(merged)
}
