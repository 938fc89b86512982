//! In-memory completion store.
//!
//! One mutex guards the whole map plus its aggregates, so stats
//! snapshots are internally consistent. Lock hold time is bounded by
//! the copy of a single entry's completion list; no I/O happens under
//! the lock.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::fingerprint::Fingerprint;
use crate::types::Completion;

/// Thread-safe map from fingerprint to the ordered completions seen
/// for it.
///
/// Entries only grow; nothing is reordered, deduplicated, or evicted
/// short of an explicit [`clear()`](Self::clear). Reads return a
/// snapshot copy: callers must never observe later appends through a
/// list they were already handed, because the partial-fill merge in the
/// engine depends on that snapshot staying fixed.
pub struct CompletionStore {
    inner: Mutex<StoreInner>,
}

#[derive(Default)]
struct StoreInner {
    entries: HashMap<Fingerprint, Vec<Completion>>,
    total: usize,
}

impl CompletionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(StoreInner::default()),
        }
    }

    /// Snapshot the completions recorded for a fingerprint.
    ///
    /// Returns an owned copy (empty when the fingerprint is unknown);
    /// the lock is released before the copy is handed out.
    pub fn list(&self, fingerprint: &Fingerprint) -> Vec<Completion> {
        self.inner
            .lock()
            .expect("store lock poisoned")
            .entries
            .get(fingerprint)
            .cloned()
            .unwrap_or_default()
    }

    /// Append completions to a fingerprint's entry, creating it if
    /// absent.
    ///
    /// `on_append` runs under the store lock once per completion, in
    /// append order. The engine uses it to enqueue journal records, so
    /// for any single fingerprint the journal order matches the
    /// in-memory order. The hook must not block.
    pub fn append(
        &self,
        fingerprint: &Fingerprint,
        completions: &[Completion],
        mut on_append: impl FnMut(&Completion),
    ) {
        if completions.is_empty() {
            return;
        }
        let mut inner = self.inner.lock().expect("store lock poisoned");
        let entry = inner.entries.entry(*fingerprint).or_default();
        for completion in completions {
            entry.push(completion.clone());
            on_append(completion);
        }
        inner.total += completions.len();
    }

    /// Drop every entry.
    pub fn clear(&self) {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        inner.entries.clear();
        inner.total = 0;
    }

    /// Number of distinct fingerprints.
    pub fn keys_count(&self) -> usize {
        self.inner.lock().expect("store lock poisoned").entries.len()
    }

    /// Total completions across all entries.
    pub fn total(&self) -> usize {
        self.inner.lock().expect("store lock poisoned").total
    }

    /// `(keys, total)` read under one lock acquisition, so the pair is
    /// consistent in a stats snapshot.
    pub fn counts(&self) -> (usize, usize) {
        let inner = self.inner.lock().expect("store lock poisoned");
        (inner.entries.len(), inner.total)
    }
}

impl Default for CompletionStore {
    fn default() -> Self {
        Self::new()
    }
}
