//! Background job scheduler — fixed-interval payment sweeps.
//!
//! Spawns one OS thread per job: the capture sweep every hour and the expiry
//! sweep every 6 hours, for the lifetime of the process. A failed thread
//! spawn degrades gracefully: the worker logs a warning and keeps running
//! without that job instead of crashing.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::Connection;

use super::capture::run_capture_sweep;
use super::error::BillingError;
use super::expiry::run_expiry_sweep;
use super::types::SweepSummary;
use crate::db::sqlite::open_database;
use crate::gateway::PaymentGateway;

/// Capture sweep cadence. Must equal the capture selection-window width so
/// the sliding window visits each appointment exactly once.
pub const CAPTURE_INTERVAL_SECS: u64 = 60 * 60;

/// Expiry sweep cadence: every 6 hours.
pub const EXPIRY_INTERVAL_SECS: u64 = 6 * 60 * 60;

/// Sleep granularity for shutdown responsiveness (5 seconds).
const SLEEP_GRANULARITY_SECS: u64 = 5;

type SweepFn = fn(&Connection, &dyn PaymentGateway, DateTime<Utc>) -> Result<SweepSummary, BillingError>;

/// Handle for the background job threads.
///
/// Supports graceful shutdown via `shutdown()` or automatic cleanup on
/// `Drop`: running sweeps complete, no new ones start.
pub struct JobSchedulerHandle {
    shutdown: Arc<AtomicBool>,
    handles: Vec<thread::JoinHandle<()>>,
}

impl JobSchedulerHandle {
    /// Request graceful shutdown. The current sweep (if running) completes,
    /// but no new sweeps start.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Number of jobs that actually started.
    pub fn job_count(&self) -> usize {
        self.handles.len()
    }
}

impl Drop for JobSchedulerHandle {
    fn drop(&mut self) {
        self.shutdown();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

/// Start both payment jobs. Call once at process startup; the returned
/// handle must be kept alive for the lifetime of the worker.
pub fn start_background_jobs(
    db_path: PathBuf,
    gateway: Arc<dyn PaymentGateway>,
) -> JobSchedulerHandle {
    let shutdown = Arc::new(AtomicBool::new(false));
    let mut handles = Vec::new();

    let jobs: [(&'static str, u64, SweepFn); 2] = [
        ("payment-capture", CAPTURE_INTERVAL_SECS, run_capture_sweep),
        ("preauth-expiry", EXPIRY_INTERVAL_SECS, run_expiry_sweep),
    ];

    for (name, interval_secs, sweep) in jobs {
        if let Some(handle) = spawn_job(
            name,
            interval_secs,
            db_path.clone(),
            gateway.clone(),
            shutdown.clone(),
            sweep,
        ) {
            handles.push(handle);
        }
    }

    JobSchedulerHandle { shutdown, handles }
}

fn spawn_job(
    name: &'static str,
    interval_secs: u64,
    db_path: PathBuf,
    gateway: Arc<dyn PaymentGateway>,
    shutdown: Arc<AtomicBool>,
    sweep: SweepFn,
) -> Option<thread::JoinHandle<()>> {
    let builder = thread::Builder::new().name(name.to_string());
    match builder.spawn(move || {
        tracing::info!(job = name, interval_secs, "Background payment job started");
        job_loop(name, interval_secs, &db_path, gateway.as_ref(), &shutdown, sweep);
    }) {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!(
                job = name,
                error = %e,
                "Could not start background job; continuing without its scheduled runs"
            );
            None
        }
    }
}

fn job_loop(
    name: &str,
    interval_secs: u64,
    db_path: &Path,
    gateway: &dyn PaymentGateway,
    shutdown: &AtomicBool,
    sweep: SweepFn,
) {
    while !shutdown.load(Ordering::Relaxed) {
        // Sleep in small increments for responsive shutdown
        for _ in 0..(interval_secs / SLEEP_GRANULARITY_SECS) {
            if shutdown.load(Ordering::Relaxed) {
                tracing::info!(job = name, "Background job shutting down");
                return;
            }
            thread::sleep(Duration::from_secs(SLEEP_GRANULARITY_SECS));
        }

        if shutdown.load(Ordering::Relaxed) {
            break;
        }

        if let Err(e) = run_once(db_path, gateway, sweep) {
            // Run-level failure: the next tick is the retry mechanism.
            tracing::error!(job = name, error = %e, "Sweep run failed");
        }
    }
    tracing::info!(job = name, "Background job shutting down");
}

fn run_once(
    db_path: &Path,
    gateway: &dyn PaymentGateway,
    sweep: SweepFn,
) -> Result<SweepSummary, BillingError> {
    // Each run opens its own connection; the two jobs write concurrently.
    let conn = open_database(db_path)?;
    sweep(&conn, gateway, Utc::now())
}
