//! Single-flight run guard
//!
//! Admits at most one job at a time. A rejected acquisition is final for that
//! call: there is no queue and no waiting.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

#[derive(Debug, Default)]
struct GuardState {
    running: Mutex<bool>,
    acquired: AtomicU64,
    released: AtomicU64,
}

impl GuardState {
    fn lock(&self) -> MutexGuard<'_, bool> {
        // A panic while holding the lock cannot leave the flag half-written
        self.running.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Mutual-exclusion flag shared by every run of one orchestrator
#[derive(Debug, Clone, Default)]
pub struct RunGuard {
    state: Arc<GuardState>,
}

impl RunGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the running flag if it is clear
    ///
    /// Returns `None`, leaving the state untouched, when a run is already
    /// active. The flag is cleared when the returned permit is dropped.
    pub fn try_acquire(&self) -> Option<RunPermit> {
        let mut running = self.state.lock();
        if *running {
            debug!("Run guard busy");
            return None;
        }
        *running = true;
        self.state.acquired.fetch_add(1, Ordering::Relaxed);
        debug!("Run guard acquired");

        Some(RunPermit {
            state: Arc::clone(&self.state),
        })
    }

    pub fn is_running(&self) -> bool {
        *self.state.lock()
    }

    /// (acquisitions, releases) since creation
    pub fn counts(&self) -> (u64, u64) {
        (
            self.state.acquired.load(Ordering::Relaxed),
            self.state.released.load(Ordering::Relaxed),
        )
    }
}

/// Proof of exclusive access; releases the guard on drop
#[derive(Debug)]
#[must_use = "dropping the permit releases the run guard immediately"]
pub struct RunPermit {
    state: Arc<GuardState>,
}

impl Drop for RunPermit {
    fn drop(&mut self) {
        *self.state.lock() = false;
        self.state.released.fetch_add(1, Ordering::Relaxed);
        debug!("Run guard released");
    }
}
