//! Bounded worker pool for verification tasks.
//!
//! The pool owns a fixed set of native worker threads pulling tasks from
//! an unbounded channel: at most N tasks hold file handles and CPU at any
//! moment, the rest wait queued. The pool also owns the only cross-thread
//! mutable state in the engine: the outstanding-task counter and the
//! error collection, each behind its own lock.
//!
//! There is no timeout on a stalled read; a file that never finishes
//! reading pins its worker slot until the process exits. Callers that
//! need hard deadlines must wrap the pool.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::thread;

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::error::EngineError;
use crate::model::{ManifestEntry, Outcome};
use crate::progress::ProgressCallback;
use crate::task::{TaskHandle, VerificationTask};

/// Default number of worker threads.
pub const DEFAULT_WORKERS: usize = 8;

/// State shared between the control side and the worker threads.
struct PoolShared {
    /// Tasks submitted but not yet terminal
    outstanding: Mutex<usize>,
    /// Captured faults, in completion order
    errors: Mutex<Vec<(usize, String)>>,
    /// Consumer of per-task events, swapped atomically per event
    observer: Mutex<Option<Arc<dyn ProgressCallback>>>,
    /// Whether the all-done notification is currently subscribed
    all_done_connected: Mutex<bool>,
}

impl PoolShared {
    fn observer(&self) -> Option<Arc<dyn ProgressCallback>> {
        self.observer.lock().expect("observer lock poisoned").clone()
    }

    /// Append a fault to the error collection. Runs at error-event time,
    /// before the task's finished event, so a drain triggered by all-done
    /// always sees every fault of the batch.
    fn record_error(&self, index: usize, fault: &EngineError) {
        let mut errors = self.errors.lock().expect("error lock poisoned");
        errors.push((index, fault.to_string()));
    }

    /// Count one task as terminal. The decrement and the zero check happen
    /// under the counter lock, so simultaneous completions cannot
    /// double-fire or skip the zero crossing; the emission itself happens
    /// after the lock is released.
    fn task_finished(&self) {
        let remaining = {
            let mut outstanding = self.outstanding.lock().expect("counter lock poisoned");
            *outstanding = outstanding.saturating_sub(1);
            *outstanding
        };

        if remaining == 0 {
            let connected = *self.all_done_connected.lock().expect("all-done lock poisoned");
            if connected {
                log::debug!("batch complete");
                if let Some(observer) = self.observer() {
                    observer.on_all_done();
                }
            }
        }
    }
}

/// Event adapter handed to every running task: forwards per-task events
/// to the attached observer and feeds the pool's error bookkeeping.
struct PoolEvents {
    shared: Arc<PoolShared>,
}

impl ProgressCallback for PoolEvents {
    fn on_beginning(&self, index: usize) {
        if let Some(observer) = self.shared.observer() {
            observer.on_beginning(index);
        }
    }

    fn on_progress(&self, index: usize, percent: u8) {
        if let Some(observer) = self.shared.observer() {
            observer.on_progress(index, percent);
        }
    }

    fn on_error(&self, index: usize, fault: &EngineError) {
        // Faults are collected whether or not anyone is listening
        self.shared.record_error(index, fault);
        if let Some(observer) = self.shared.observer() {
            observer.on_error(index, fault);
        }
    }

    fn on_finished(&self, index: usize, outcome: Outcome, digest: &str) {
        if let Some(observer) = self.shared.observer() {
            observer.on_finished(index, outcome, digest);
        }
    }

    fn on_all_done(&self) {
        // Batch completion is raised by the pool itself, never by a task
    }
}

/// Fixed-capacity scheduler for verification tasks.
///
/// Submissions happen on one control thread while workers finish tasks
/// concurrently; every submitted task reaches a terminal state and is
/// counted exactly once, and a fault in one task never aborts its
/// siblings. The pool instance outlives individual batches: counters
/// return to zero between runs and the error collection is drained by the
/// caller once per batch.
pub struct WorkerPool {
    queue: Option<Sender<VerificationTask>>,
    workers: Vec<thread::JoinHandle<()>>,
    shared: Arc<PoolShared>,
}

impl WorkerPool {
    /// Create a pool with the default worker count.
    pub fn new() -> Self {
        Self::with_workers(DEFAULT_WORKERS)
    }

    /// Create a pool with `workers` worker threads (at least one).
    pub fn with_workers(workers: usize) -> Self {
        let workers = workers.max(1);
        let (queue_tx, queue_rx) = unbounded::<VerificationTask>();
        let shared = Arc::new(PoolShared {
            outstanding: Mutex::new(0),
            errors: Mutex::new(Vec::new()),
            observer: Mutex::new(None),
            all_done_connected: Mutex::new(false),
        });

        let handles = (0..workers)
            .map(|_| {
                let queue = queue_rx.clone();
                let shared = Arc::clone(&shared);
                thread::spawn(move || worker_loop(queue, shared))
            })
            .collect();

        WorkerPool {
            queue: Some(queue_tx),
            workers: handles,
            shared,
        }
    }

    /// Attach the consumer of per-task events. Takes effect immediately,
    /// including for tasks already running.
    pub fn attach_observer(&self, observer: Arc<dyn ProgressCallback>) {
        *self.shared.observer.lock().expect("observer lock poisoned") = Some(observer);
    }

    /// Detach the current observer; subsequent events go nowhere.
    pub fn detach_observer(&self) {
        *self.shared.observer.lock().expect("observer lock poisoned") = None;
    }

    /// Subscribe the attached observer to the batch-level all-done
    /// notification. Must be re-connected after `stop_batch` before a new
    /// run; a stopped batch disconnects it so a stale completion cannot
    /// fire into a restarted run.
    pub fn connect_all_done(&self) {
        *self.shared.all_done_connected.lock().expect("all-done lock poisoned") = true;
    }

    /// Unsubscribe the all-done notification.
    pub fn disconnect_all_done(&self) {
        *self.shared.all_done_connected.lock().expect("all-done lock poisoned") = false;
    }

    /// Register and enqueue one task, returning its stop handle.
    ///
    /// The outstanding counter is incremented before the task is queued,
    /// so the all-done accounting covers tasks that are still waiting for
    /// a free worker.
    pub fn submit(&self, task: VerificationTask) -> TaskHandle {
        let handle = task.handle();

        {
            let mut outstanding = self.shared.outstanding.lock().expect("counter lock poisoned");
            *outstanding += 1;
        }

        log::debug!("queued task {} for {}", handle.index(), task.file_path().display());
        let queued = match &self.queue {
            Some(queue) => queue.send(task).is_ok(),
            None => false,
        };
        if !queued {
            // Queue closed mid-shutdown; keep the counter honest
            self.shared.task_finished();
        }

        handle
    }

    /// Submit one task per manifest entry, with indices `0..entries.len()`.
    /// Relative filenames resolve against `base_dir`.
    pub fn submit_batch(&self, base_dir: &Path, entries: &[ManifestEntry]) -> Vec<TaskHandle> {
        entries
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                let path = entry.resolve_path(base_dir);
                self.submit(VerificationTask::new(index, path, entry.data_checksum.clone()))
            })
            .collect()
    }

    /// Stop a batch: disconnect the all-done subscription, then flag every
    /// task. Tasks already terminal keep their outcomes; the rest wind
    /// down as Cancelled. The counter still drains to zero so the pool is
    /// immediately reusable.
    pub fn stop_batch(&self, handles: &[TaskHandle]) {
        self.disconnect_all_done();
        for handle in handles {
            handle.stop();
        }
        log::debug!("stop requested for {} task(s)", handles.len());
    }

    /// Take and reset the collected `(index, fault)` pairs. Called once
    /// per completed batch.
    pub fn drain_errors(&self) -> Vec<(usize, String)> {
        let mut errors = self.shared.errors.lock().expect("error lock poisoned");
        std::mem::take(&mut *errors)
    }

    /// Number of submitted tasks that have not reached a terminal state.
    pub fn outstanding(&self) -> usize {
        *self.shared.outstanding.lock().expect("counter lock poisoned")
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Closing the queue lets workers finish what is queued and exit
        self.queue.take();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

fn worker_loop(queue: Receiver<VerificationTask>, shared: Arc<PoolShared>) {
    let events = PoolEvents {
        shared: Arc::clone(&shared),
    };
    while let Ok(task) = queue.recv() {
        let _report = task.run(&events);
        shared.task_finished();
    }
}
