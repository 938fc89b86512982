//! Telemetry metric name constants.
//!
//! Centralised metric names for gencache operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `gencache_`. Counters end in `_total`,
//! gauges use meaningful nouns.
//!
//! # Common labels
//!
//! - `endpoint` — HTTP surface invoked ("generate", "completions", "chat")
//! - `outcome` — lookup outcome: "hit" or "miss"

/// Total proxied generation requests.
///
/// Labels: `endpoint`.
pub const REQUESTS_TOTAL: &str = "gencache_requests_total";

/// Total lookups that found at least one cached completion.
pub const CACHE_HITS_TOTAL: &str = "gencache_cache_hits_total";

/// Total lookups that found nothing cached.
pub const CACHE_MISSES_TOTAL: &str = "gencache_cache_misses_total";

/// Total calls forwarded to the upstream backend.
pub const UPSTREAM_REQUESTS_TOTAL: &str = "gencache_upstream_requests_total";

/// Total journal records written to disk.
pub const JOURNAL_WRITES_TOTAL: &str = "gencache_journal_writes_total";

/// Total journal write failures (the record stays pending).
pub const JOURNAL_WRITE_ERRORS_TOTAL: &str = "gencache_journal_write_errors_total";

/// Journal records enqueued but not yet on disk.
pub const JOURNAL_PENDING_WRITES: &str = "gencache_journal_pending_writes";
