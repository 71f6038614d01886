//! Checkup - Command-line interface for the checksum verification engine.
//!
//! Loads a manifest of expected MD5 digests, verifies every listed file on
//! the engine's worker pool, and renders per-file results plus an overall
//! progress bar to the terminal.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use crossbeam_channel::{unbounded, Sender};
use engine::{
    BatchProgress, EngineError, Manifest, Outcome, ProgressCallback, WorkerPool, DEFAULT_WORKERS,
    DIGEST_NOT_VERIFIED,
};

/// Checkup - verify local files against a manifest of MD5 checksums
#[derive(Parser, Debug)]
#[command(name = "checkup")]
#[command(version = "0.1.0")]
#[command(about = "Verify files against a manifest of expected MD5 checksums")]
struct Args {
    /// Path to the manifest JSON file
    #[arg(value_name = "MANIFEST")]
    manifest: PathBuf,

    /// Base directory for relative manifest entries
    /// (defaults to the manifest's directory)
    #[arg(long, value_name = "PATH")]
    root: Option<PathBuf>,

    /// Number of files verified in parallel
    #[arg(long, value_name = "N", default_value_t = DEFAULT_WORKERS)]
    workers: usize,

    /// Enable verbose per-file output
    #[arg(long)]
    verbose: bool,
}

/// Engine events forwarded from worker threads to the rendering loop.
#[derive(Debug)]
enum TaskEvent {
    Beginning { index: usize },
    Progress { index: usize, percent: u8 },
    Error { index: usize, detail: String },
    Finished { index: usize, outcome: Outcome, digest: String },
    AllDone,
}

/// A ProgressCallback implementation that sends events to the rendering
/// loop via a channel.
struct ChannelProgress {
    sender: Sender<TaskEvent>,
}

impl ProgressCallback for ChannelProgress {
    fn on_beginning(&self, index: usize) {
        let _ = self.sender.send(TaskEvent::Beginning { index });
    }

    fn on_progress(&self, index: usize, percent: u8) {
        let _ = self.sender.send(TaskEvent::Progress { index, percent });
    }

    fn on_error(&self, index: usize, fault: &EngineError) {
        let _ = self.sender.send(TaskEvent::Error {
            index,
            detail: fault.to_string(),
        });
    }

    fn on_finished(&self, index: usize, outcome: Outcome, digest: &str) {
        let _ = self.sender.send(TaskEvent::Finished {
            index,
            outcome,
            digest: digest.to_string(),
        });
    }

    fn on_all_done(&self) {
        let _ = self.sender.send(TaskEvent::AllDone);
    }
}

/// Display state for one manifest entry.
struct Row {
    filename: String,
    expected: String,
    computed: String,
    outcome: Option<Outcome>,
}

fn print_progress_bar(percent: u8) -> String {
    let filled = (percent / 5) as usize;
    let empty = 20 - filled;
    format!("[{}{}] {}%", "=".repeat(filled), " ".repeat(empty), percent)
}

fn format_duration(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let mins = secs / 60;
    if mins > 0 {
        format!("{}m {}s", mins, secs % 60)
    } else {
        format!("{:.1}s", elapsed.as_secs_f64())
    }
}

/// Parse arguments, run the verification, exit with the outcome code
fn main() {
    env_logger::init();
    let args = Args::parse();

    let exit_code = match run_cli(&args) {
        Ok(code) => code,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            2
        }
    };

    std::process::exit(exit_code);
}

/// Main CLI logic - separated for testability.
///
/// Returns the process exit code: 0 when every file passed, 1 when some
/// files failed or were missing, 2 when unexpected faults were captured.
fn run_cli(args: &Args) -> Result<i32, String> {
    let manifest = Manifest::load(&args.manifest).map_err(|e| e.to_string())?;

    if manifest.is_empty() {
        eprintln!("Manifest has no entries; nothing to verify.");
        return Ok(0);
    }

    for (index, entry) in manifest.entries.iter().enumerate() {
        if !entry.has_well_formed_digest() {
            log::warn!(
                "entry {} ({}): expected digest is not 32 lowercase hex chars; it can never match",
                index,
                entry.filename
            );
        }
    }

    let base_dir = match &args.root {
        Some(root) => root.clone(),
        None => args
            .manifest
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
    };

    let mut rows: Vec<Row> = manifest
        .entries
        .iter()
        .map(|entry| Row {
            filename: entry.filename.clone(),
            expected: entry.data_checksum.clone(),
            computed: DIGEST_NOT_VERIFIED.to_string(),
            outcome: None,
        })
        .collect();

    eprintln!(
        "Verifying {} file(s) against {} ({} workers)",
        manifest.len(),
        args.manifest.display(),
        args.workers.max(1)
    );

    let pool = WorkerPool::with_workers(args.workers);
    let (tx, rx) = unbounded();
    pool.attach_observer(Arc::new(ChannelProgress { sender: tx }));
    pool.connect_all_done();
    let _handles = pool.submit_batch(&base_dir, &manifest.entries);

    let start_time = Instant::now();
    let mut progress = BatchProgress::new(manifest.len());
    let mut finished_count = 0usize;
    let mut last_redraw = Instant::now();

    for event in rx.iter() {
        match event {
            TaskEvent::Beginning { index } => {
                if args.verbose {
                    eprintln!("[{:3}] Verifying: {}", index, rows[index].filename);
                }
            }
            TaskEvent::Progress { index, percent } => {
                progress.record(index, percent);
                // Throttle redraws to avoid spam (max once per 200ms)
                if last_redraw.elapsed().as_millis() >= 200 {
                    last_redraw = Instant::now();
                    eprint!(
                        "\rProgress: {} | {}/{} files",
                        print_progress_bar(progress.percent()),
                        finished_count,
                        rows.len()
                    );
                    let _ = std::io::Write::flush(&mut std::io::stderr());
                }
            }
            TaskEvent::Error { index, detail } => {
                if args.verbose {
                    eprintln!("[{:3}] Fault: {}", index, detail);
                }
            }
            TaskEvent::Finished { index, outcome, digest } => {
                finished_count += 1;
                rows[index].outcome = Some(outcome);
                rows[index].computed = digest;
                if args.verbose {
                    eprintln!("[{:3}] {}: {}", index, outcome, rows[index].filename);
                }
            }
            TaskEvent::AllDone => break,
        }
    }

    eprintln!();
    eprintln!("Verification complete in {}", format_duration(start_time.elapsed()));
    eprintln!();

    print_table(&rows);

    let faults = pool.drain_errors();
    let passed = count_outcome(&rows, Outcome::Passed);
    let failed = count_outcome(&rows, Outcome::Failed);
    let missing = count_outcome(&rows, Outcome::Missing);

    println!();
    if faults.is_empty() {
        println!(
            "Summary: {} passed, {} failed, {} missing (of {})",
            passed,
            failed,
            missing,
            rows.len()
        );
    } else {
        println!("Unexpected faults:");
        for (index, detail) in &faults {
            println!("  [{:3}] {}", index, detail);
        }
        println!(
            "Summary: {} passed, {} failed, {} missing, {} errored (of {})",
            passed,
            failed,
            missing,
            faults.len(),
            rows.len()
        );
    }

    if !faults.is_empty() {
        Ok(2)
    } else if passed == rows.len() {
        Ok(0)
    } else {
        Ok(1)
    }
}

fn count_outcome(rows: &[Row], outcome: Outcome) -> usize {
    rows.iter().filter(|r| r.outcome == Some(outcome)).count()
}

fn print_table(rows: &[Row]) {
    println!(
        "{:<4} {:<28} {:<34} {:<34} {}",
        "#", "File", "Expected MD5", "Computed MD5", "Result"
    );
    for (index, row) in rows.iter().enumerate() {
        let result = row
            .outcome
            .map(|o| o.to_string())
            .unwrap_or_else(|| "Pending".to_string());
        println!(
            "{:<4} {:<28} {:<34} {:<34} {}",
            index, row.filename, row.expected, row.computed, result
        );
    }
}
