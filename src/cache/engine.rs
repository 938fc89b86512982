//! The cache engine: fingerprinting, store, and journal combined.
//!
//! One engine instance lives for the process: created at server start
//! (replaying the journal), passed by handle into the request pipeline,
//! and shut down after the HTTP server drains. There is no implicit
//! global.
//!
//! The engine deliberately does not coalesce concurrent misses: two
//! simultaneous requests with the same fingerprint and a cold cache
//! each go upstream and each append their results. The entry grows by
//! both result sets and later requests read them in insertion order.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tracing::debug;

use crate::cache::journal::Journal;
use crate::cache::store::CompletionStore;
use crate::fingerprint::{self, Fingerprint};
use crate::telemetry;
use crate::types::{Completion, GenerateRequest};
use crate::Result;

/// Result of a cache lookup.
#[derive(Debug)]
pub struct Lookup {
    /// Snapshot of cached completions, at most the requested count.
    /// Invariant under any subsequent [`CacheEngine::store`] call.
    pub cached: Vec<Completion>,
    /// How many completions the upstream still has to produce.
    pub needed: usize,
    /// Fingerprint of the request, for the follow-up store.
    pub fingerprint: Fingerprint,
}

/// Cache statistics, serialized verbatim into `/cache/stats`.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub num_keys: usize,
    pub total_responses: usize,
    pub pending_writes: u64,
    pub hit_rate: f64,
}

/// Process-wide response cache with journal-backed persistence.
pub struct CacheEngine {
    store: CompletionStore,
    journal: Journal,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CacheEngine {
    /// Open the engine over `cache_dir`, replaying the journal into
    /// memory.
    ///
    /// Failure to create the cache directory is fatal. Must be called
    /// from within a tokio runtime (the journal spawns its writer
    /// task). Hit/miss counters always start at zero; statistics are
    /// process-local.
    pub fn open(cache_dir: &Path, overwrite: bool) -> Result<Self> {
        let (journal, records) = Journal::open(cache_dir, overwrite)?;

        let store = CompletionStore::new();
        for (fingerprint, completion) in records {
            // replay bypasses the journal: loading must not rewrite it
            store.append(&fingerprint, &[completion], |_| {});
        }

        let (num_keys, total) = store.counts();
        debug!(num_keys, total, "cache loaded from journal");

        Ok(Self {
            store,
            journal,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        })
    }

    /// Fingerprint a request and read a snapshot of its entry.
    ///
    /// A request for `n` completions with `k` cached yields
    /// `min(k, n)` cached completions (earliest-inserted first) and
    /// `needed = n - min(k, n)`. Any request served at least one
    /// cached completion counts as a hit; a fully cold entry counts
    /// as a miss. Accounting happens here, once per request and
    /// never per completion.
    pub fn lookup(&self, request: &GenerateRequest) -> Result<Lookup> {
        let (fingerprint, n) = fingerprint::fingerprint(request)?;
        let mut cached = self.store.list(&fingerprint);

        if cached.is_empty() {
            self.misses.fetch_add(1, Ordering::Relaxed);
            metrics::counter!(telemetry::CACHE_MISSES_TOTAL).increment(1);
        } else {
            self.hits.fetch_add(1, Ordering::Relaxed);
            metrics::counter!(telemetry::CACHE_HITS_TOTAL).increment(1);
        }

        cached.truncate(n);
        let needed = n - cached.len();
        debug!(%fingerprint, n, cached = cached.len(), needed, "cache lookup");

        Ok(Lookup {
            cached,
            needed,
            fingerprint,
        })
    }

    /// Append freshly generated completions and queue them for the
    /// journal.
    ///
    /// The journal enqueue happens under the store lock, so the on-disk
    /// order for a fingerprint always matches the in-memory order.
    pub fn store(&self, fingerprint: &Fingerprint, completions: &[Completion]) {
        self.store.append(fingerprint, completions, |completion| {
            self.journal.enqueue(fingerprint, completion);
        });
    }

    /// Current statistics snapshot.
    pub fn stats(&self) -> CacheStats {
        let (num_keys, total_responses) = self.store.counts();
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let lookups = hits + misses;
        CacheStats {
            hits,
            misses,
            num_keys,
            total_responses,
            pending_writes: self.journal.pending_writes(),
            hit_rate: if lookups > 0 {
                hits as f64 / lookups as f64
            } else {
                0.0
            },
        }
    }

    /// Drop every entry, truncate the journal, and reset the counters.
    ///
    /// Journal writes already queued are drained to disk before the
    /// truncation runs, so the file ends up empty rather than
    /// resurrecting in-flight records.
    pub async fn clear(&self) {
        self.store.clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.journal.clear().await;
    }

    /// Flush pending journal records and stop the writer.
    pub async fn shutdown(&self) {
        self.journal.shutdown().await;
    }

    /// Path of the on-disk journal, for `/cache/info`.
    pub fn cache_file(&self) -> &Path {
        self.journal.path()
    }
}
