//! Append-only on-disk journal.
//!
//! One JSON record per line: `{"key": <hex fingerprint>, "value":
//! <completion>}`. Request handlers never touch the disk: they enqueue
//! records onto an unbounded channel and a single background worker
//! serializes, appends, and flushes. Because the worker is alone on the
//! file and the channel is FIFO, lines are never interleaved and a
//! clear always lands after every write enqueued before it.
//!
//! Durability is best-effort: no fsync, and records still in the queue
//! at crash time are lost. The file stays well-formed at line
//! granularity either way.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::fingerprint::Fingerprint;
use crate::telemetry;
use crate::types::Completion;
use crate::Result;

/// Journal file name inside the cache directory.
pub const JOURNAL_FILE: &str = "cache.jsonl";

/// One line of the journal.
#[derive(Debug, Serialize, Deserialize)]
struct JournalRecord {
    key: String,
    value: Completion,
}

enum Op {
    Append(String),
    Clear(oneshot::Sender<()>),
    Shutdown,
}

/// Handle to the journal worker.
///
/// Created by [`Journal::open`], which also replays the existing file.
/// Dropping the handle without [`shutdown()`](Self::shutdown) abandons
/// queued records.
pub struct Journal {
    tx: mpsc::UnboundedSender<Op>,
    pending: Arc<AtomicU64>,
    worker: Mutex<Option<JoinHandle<()>>>,
    path: PathBuf,
}

impl Journal {
    /// Open the journal under `cache_dir`, replay its records, and
    /// start the background writer.
    ///
    /// Returns the handle plus the replayed records in file order.
    /// Failure to create the cache directory is fatal; malformed lines
    /// in the file are skipped with a warning. Must be called from
    /// within a tokio runtime.
    pub fn open(cache_dir: &Path, overwrite: bool) -> Result<(Self, Vec<(Fingerprint, Completion)>)> {
        std::fs::create_dir_all(cache_dir)?;
        let path = cache_dir.join(JOURNAL_FILE);

        if overwrite && path.exists() {
            std::fs::remove_file(&path)?;
            debug!(path = %path.display(), "removed existing journal");
        }

        let records = load_records(&path);

        let (tx, rx) = mpsc::unbounded_channel();
        let pending = Arc::new(AtomicU64::new(0));
        let worker = tokio::spawn(run_worker(rx, path.clone(), Arc::clone(&pending)));

        Ok((
            Self {
                tx,
                pending,
                worker: Mutex::new(Some(worker)),
                path,
            },
            records,
        ))
    }

    /// Path of the journal file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records enqueued but not yet written.
    pub fn pending_writes(&self) -> u64 {
        self.pending.load(Ordering::Relaxed)
    }

    /// Enqueue one record. Non-blocking; never fails the caller.
    pub fn enqueue(&self, fingerprint: &Fingerprint, completion: &Completion) {
        let record = JournalRecord {
            key: fingerprint.to_string(),
            value: completion.clone(),
        };
        let line = match serde_json::to_string(&record) {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "failed to serialize journal record; dropping");
                return;
            }
        };
        self.pending.fetch_add(1, Ordering::Relaxed);
        metrics::gauge!(telemetry::JOURNAL_PENDING_WRITES)
            .set(self.pending.load(Ordering::Relaxed) as f64);
        if self.tx.send(Op::Append(line)).is_err() {
            self.pending.fetch_sub(1, Ordering::Relaxed);
            warn!("journal worker is gone; record not persisted");
        }
    }

    /// Truncate the journal file.
    ///
    /// The truncation is queued behind every record enqueued before it,
    /// so the on-disk state after the returned future resolves is
    /// empty. Worker failures are logged, not surfaced; the in-memory
    /// store stays authoritative.
    pub async fn clear(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(Op::Clear(ack_tx)).is_err() {
            warn!("journal worker is gone; clear not persisted");
            return;
        }
        if ack_rx.await.is_err() {
            warn!("journal worker exited before acknowledging clear");
        }
    }

    /// Drain queued records, stop the worker, and close the file.
    pub async fn shutdown(&self) {
        let _ = self.tx.send(Op::Shutdown);
        let handle = self.worker.lock().expect("journal lock poisoned").take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "journal worker panicked during shutdown");
            }
        }
    }
}

/// Replay the journal file in line order.
///
/// Blank and unparseable lines are tolerated; each skip is logged with
/// its line number.
fn load_records(path: &Path) -> Vec<(Fingerprint, Completion)> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read journal; starting empty");
            return Vec::new();
        }
    };

    let mut records = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record: JournalRecord = match serde_json::from_str(line) {
            Ok(record) => record,
            Err(e) => {
                warn!(line = line_no + 1, error = %e, "skipping malformed journal line");
                continue;
            }
        };
        match Fingerprint::parse_hex(&record.key) {
            Ok(fingerprint) => records.push((fingerprint, record.value)),
            Err(e) => {
                warn!(line = line_no + 1, error = %e, "skipping journal line with bad key");
            }
        }
    }
    records
}

async fn run_worker(
    mut rx: mpsc::UnboundedReceiver<Op>,
    path: PathBuf,
    pending: Arc<AtomicU64>,
) {
    let mut file = open_append(&path).await;

    while let Some(op) = rx.recv().await {
        match op {
            Op::Append(line) => {
                // a failed open is retried per record; transient disk
                // trouble must not wedge the worker
                if file.is_none() {
                    file = open_append(&path).await;
                }
                match write_line(file.as_mut(), &line).await {
                    Ok(()) => {
                        pending.fetch_sub(1, Ordering::Relaxed);
                        metrics::counter!(telemetry::JOURNAL_WRITES_TOTAL).increment(1);
                        metrics::gauge!(telemetry::JOURNAL_PENDING_WRITES)
                            .set(pending.load(Ordering::Relaxed) as f64);
                    }
                    Err(e) => {
                        // the record stays pending; in-memory state is
                        // authoritative
                        metrics::counter!(telemetry::JOURNAL_WRITE_ERRORS_TOTAL).increment(1);
                        warn!(error = %e, "journal write failed");
                        file = None;
                    }
                }
            }
            Op::Clear(ack) => {
                drop(file.take());
                if let Err(e) = truncate_atomically(&path).await {
                    warn!(error = %e, "journal truncation failed");
                }
                file = open_append(&path).await;
                let _ = ack.send(());
            }
            Op::Shutdown => break,
        }
    }

    if let Some(mut f) = file {
        let _ = f.flush().await;
    }
}

async fn open_append(path: &Path) -> Option<File> {
    match OpenOptions::new().create(true).append(true).open(path).await {
        Ok(file) => Some(file),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to open journal for append");
            None
        }
    }
}

async fn write_line(file: Option<&mut File>, line: &str) -> std::io::Result<()> {
    let file = file.ok_or_else(|| std::io::Error::other("journal file not open"))?;
    file.write_all(line.as_bytes()).await?;
    file.write_all(b"\n").await?;
    file.flush().await
}

/// Replace the journal with an empty file via temp-file + rename, so a
/// crash mid-clear never leaves a half-truncated journal.
async fn truncate_atomically(path: &Path) -> std::io::Result<()> {
    let tmp = path.with_extension("jsonl.tmp");
    tokio::fs::write(&tmp, b"").await?;
    tokio::fs::rename(&tmp, path).await
}
