//! Tracing setup and in-process counters

use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber (`RUST_LOG`, default `info`)
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // A subscriber may already be set by a test harness or embedding app
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Counters for runs and cache evictions
#[derive(Debug, Default)]
pub struct Metrics {
    runs_started: AtomicU64,
    runs_rejected: AtomicU64,
    runs_failed: AtomicU64,
    runs_succeeded: AtomicU64,
    cache_entries_evicted: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn run_started(&self) {
        self.runs_started.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "runs_started", "Metric incremented");
    }

    pub fn run_rejected(&self) {
        self.runs_rejected.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "runs_rejected", "Metric incremented");
    }

    pub fn run_failed(&self) {
        self.runs_failed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "runs_failed", "Metric incremented");
    }

    pub fn run_succeeded(&self) {
        self.runs_succeeded.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "runs_succeeded", "Metric incremented");
    }

    pub fn entries_evicted(&self, count: u64) {
        self.cache_entries_evicted.fetch_add(count, Ordering::Relaxed);
        tracing::debug!(counter = "cache_entries_evicted", count, "Metric incremented");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            runs_started: self.runs_started.load(Ordering::Relaxed),
            runs_rejected: self.runs_rejected.load(Ordering::Relaxed),
            runs_failed: self.runs_failed.load(Ordering::Relaxed),
            runs_succeeded: self.runs_succeeded.load(Ordering::Relaxed),
            cache_entries_evicted: self.cache_entries_evicted.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub runs_started: u64,
    pub runs_rejected: u64,
    pub runs_failed: u64,
    pub runs_succeeded: u64,
    pub cache_entries_evicted: u64,
}
