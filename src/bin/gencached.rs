//! gencached — caching reverse proxy daemon.
//!
//! Sits in front of an LLM inference backend, answers repeated
//! generation requests from a persistent response cache, and forwards
//! genuine misses upstream.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};

use gencache::cache::CacheEngine;
use gencache::server::config::Config;
use gencache::server::{AppState, router};
use gencache::upstream::{CompletionBackend, HttpUpstream};

/// Caching reverse proxy for an LLM inference backend.
#[derive(Parser)]
#[command(name = "gencached")]
#[command(version = gencache::PKG_VERSION)]
#[command(about = "Caching reverse proxy for an LLM inference backend")]
struct Args {
    /// URL of the upstream inference server (e.g. http://127.0.0.1:30000).
    #[arg(long)]
    upstream_url: Option<String>,

    /// Host to bind the proxy to.
    #[arg(long)]
    host: Option<String>,

    /// Port to bind the proxy to.
    #[arg(long)]
    port: Option<u16>,

    /// Directory for cache storage (default: ~/.gencache).
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Remove any existing cache file before loading.
    #[arg(long)]
    overwrite: bool,

    /// Upstream request timeout in seconds.
    #[arg(long)]
    upstream_timeout_secs: Option<u64>,

    /// Path to configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose logging (debug level unless RUST_LOG is set).
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    // Load configuration, then let CLI flags win
    let mut config = Config::load(args.config.as_deref())?;
    if let Some(url) = args.upstream_url {
        config.upstream.url = Some(url);
    }
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(dir) = args.cache_dir {
        config.cache.dir = Some(dir);
    }
    if args.overwrite {
        config.cache.overwrite = true;
    }
    if let Some(secs) = args.upstream_timeout_secs {
        config.upstream.timeout_secs = secs;
    }

    let upstream_url = config.upstream.url.clone().ok_or_else(|| {
        gencache::GencacheError::Configuration(
            "no upstream URL; pass --upstream-url or set [upstream] url in config.toml"
                .to_string(),
        )
    })?;

    // Failing to create the cache directory is fatal
    let cache_dir = config.cache.dir_or_default();
    let engine = Arc::new(CacheEngine::open(&cache_dir, config.cache.overwrite)?);

    let upstream = Arc::new(HttpUpstream::new(
        &upstream_url,
        Duration::from_secs(config.upstream.timeout_secs),
    )?);

    match upstream.health().await {
        Ok(()) => info!(url = %upstream_url, "upstream reachable"),
        Err(e) => warn!(url = %upstream_url, error = %e, "upstream health probe failed; continuing"),
    }

    let state = AppState {
        engine: Arc::clone(&engine),
        upstream,
    };
    let app = router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    // Failing to bind is fatal
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(
        version = gencache::version_string(),
        %addr,
        upstream = %upstream_url,
        cache_file = %engine.cache_file().display(),
        "gencached listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("draining journal");
    engine.shutdown().await;
    info!("shutdown complete");

    Ok(())
}

/// Resolve on ctrl-c or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
