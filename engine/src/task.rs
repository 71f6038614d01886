//! Verification task: one file, one expected digest, one terminal outcome.
//!
//! A task moves from an implicit Pending through Running to a terminal
//! state: Passed, Failed, Missing, Cancelled or Errored. All lifecycle
//! events go through a ProgressCallback; the pool supplies one that also
//! does batch bookkeeping, but a task runs fine standalone (tests do
//! exactly that).

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::checksums::{pick_chunk_size, ChecksumReader};
use crate::error::EngineError;
use crate::model::{Outcome, TaskReport};
use crate::progress::ProgressCallback;

/// Digest placeholder for a file that did not exist at scheduling time.
pub const DIGEST_MISSING: &str = "(file missing)";

/// Digest placeholder for a task stopped before completion; also the
/// natural initial display value for a row that has not been verified.
pub const DIGEST_NOT_VERIFIED: &str = "(not verified)";

/// Digest placeholder for a task that hit an unexpected fault.
pub const DIGEST_ERRORED: &str = "(read error)";

/// Handle for stopping a submitted task.
///
/// Cloning is cheap; every clone shares the same flag. Stopping is
/// cooperative: the running task checks the flag between chunk reads and
/// exits promptly, never abandoning a read mid-chunk.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    index: usize,
    active: Arc<AtomicBool>,
}

impl TaskHandle {
    /// Batch index of the task this handle controls.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Request the task to stop. Idempotent.
    pub fn stop(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    /// Returns false once a stop has been requested.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

/// One checksum verification: streams a file through MD5 and compares the
/// digest against the expected value.
#[derive(Debug)]
pub struct VerificationTask {
    index: usize,
    file_path: PathBuf,
    expected_digest: String,
    active: Arc<AtomicBool>,
}

impl VerificationTask {
    /// Create a task. `index` is the task's position in its batch and is
    /// carried on every event the task emits.
    pub fn new(index: usize, file_path: impl Into<PathBuf>, expected_digest: impl Into<String>) -> Self {
        VerificationTask {
            index,
            file_path: file_path.into(),
            expected_digest: expected_digest.into(),
            active: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Batch index of this task.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Path of the file this task verifies.
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// Obtain a stop handle for this task.
    pub fn handle(&self) -> TaskHandle {
        TaskHandle {
            index: self.index,
            active: Arc::clone(&self.active),
        }
    }

    /// Execute the verification to a terminal state.
    ///
    /// Event order for this task is always: `on_beginning`, zero or more
    /// `on_progress`, at most one `on_error`, then exactly one
    /// `on_finished`, regardless of which terminal path is taken.
    pub fn run(self, events: &dyn ProgressCallback) -> TaskReport {
        events.on_beginning(self.index);

        let report = if !self.file_path.exists() {
            TaskReport {
                index: self.index,
                outcome: Outcome::Missing,
                digest: DIGEST_MISSING.to_owned(),
            }
        } else {
            match self.verify(events) {
                Ok(report) => report,
                Err(fault) => {
                    log::warn!("task {} ({}): {}", self.index, self.file_path.display(), fault);
                    events.on_error(self.index, &fault);
                    TaskReport {
                        index: self.index,
                        outcome: Outcome::Errored,
                        digest: DIGEST_ERRORED.to_owned(),
                    }
                }
            }
        };

        events.on_finished(report.index, report.outcome, &report.digest);
        report
    }

    /// Stream the file and classify the result. Any `Err` here becomes an
    /// Errored terminal in `run`.
    fn verify(&self, events: &dyn ProgressCallback) -> Result<TaskReport, EngineError> {
        let total_size = fs::metadata(&self.file_path)
            .map_err(|e| EngineError::Metadata {
                path: self.file_path.clone(),
                source: e,
            })?
            .len();

        let chunk_size = pick_chunk_size(total_size);
        let mut reader = ChecksumReader::open(&self.file_path, chunk_size)?;

        // The stop flag is polled between chunk reads only; a read that is
        // already in flight completes before the task winds down.
        while self.active.load(Ordering::SeqCst) {
            match reader.read_chunk()? {
                Some(bytes_read) => {
                    let percent = if total_size == 0 {
                        100
                    } else {
                        (bytes_read * 100 / total_size).min(100) as u8
                    };
                    events.on_progress(self.index, percent);
                }
                None => break,
            }
        }

        if !self.active.load(Ordering::SeqCst) {
            // Partial digest state is discarded with the reader
            events.on_progress(self.index, 0);
            return Ok(TaskReport {
                index: self.index,
                outcome: Outcome::Cancelled,
                digest: DIGEST_NOT_VERIFIED.to_owned(),
            });
        }

        if total_size == 0 {
            events.on_progress(self.index, 100);
        }

        let digest = reader.finalize_hex();
        let outcome = if digest == self.expected_digest {
            Outcome::Passed
        } else {
            Outcome::Failed
        };

        Ok(TaskReport {
            index: self.index,
            outcome,
            digest,
        })
    }
}
