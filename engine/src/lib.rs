//! # Checkup Engine - Concurrent Checksum Verification Library
//!
//! A headless engine for verifying a batch of local files against a
//! manifest of expected MD5 checksums. Designed as the foundation for
//! multiple consumers (CLI, GUI, automation).
//!
//! ## Overview
//!
//! The engine runs one verification task per manifest entry on a bounded
//! worker pool. It features:
//! - Streaming MD5 computation in constant memory
//! - Per-task lifecycle events (beginning, progress, error, finished)
//! - Five-way outcome classification (passed, failed, missing, cancelled,
//!   errored) with per-task fault isolation
//! - Cooperative cancellation of a running batch
//! - A batch-level all-done signal delivered exactly once per run
//!
//! ## Basic Usage
//!
//! ```no_run
//! use std::path::Path;
//! use engine::{Manifest, WorkerPool};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manifest = Manifest::load(Path::new("manifest.json"))?;
//!
//! let pool = WorkerPool::new();
//! // pool.attach_observer(...) to receive events
//! pool.connect_all_done();
//! let handles = pool.submit_batch(Path::new("."), &manifest.entries);
//!
//! // ... consume events; after the all-done signal:
//! for (index, fault) in pool.drain_errors() {
//!     eprintln!("entry {}: {}", index, fault);
//! }
//! # let _ = handles;
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - **model**: Manifest round-trip, outcomes, task reports
//! - **error**: Error types and handling
//! - **checksums**: Streaming MD5 reader and chunk-size policy
//! - **task**: Single-file verification state machine
//! - **pool**: Bounded worker pool / scheduler
//! - **progress**: Progress callback trait and batch aggregator

pub mod checksums;
pub mod error;
pub mod model;
pub mod pool;
pub mod progress;
pub mod task;

// Re-export main types and functions
pub use checksums::{pick_chunk_size, ChecksumReader, EMPTY_DIGEST};
pub use error::EngineError;
pub use model::{Manifest, ManifestEntry, Outcome, TaskReport};
pub use pool::{WorkerPool, DEFAULT_WORKERS};
pub use progress::{BatchProgress, ProgressCallback};
pub use task::{TaskHandle, VerificationTask, DIGEST_ERRORED, DIGEST_MISSING, DIGEST_NOT_VERIFIED};
