/// Retention policy evaluation
///
/// Two trigger points:
/// - startup: `3days` / `7days` sweep every entry last modified strictly
///   before `now - N days`
/// - after a run: `immediate` deletes the entry for the processed input
///
/// `off` never deletes anything, and the time-based strategies never delete
/// after a run.
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;

use tracing::{debug, info, warn};

use crate::events::{Event, EventSink};
use crate::observability::Metrics;
use crate::settings::CacheStrategy;

use super::error::Result;
use super::keys::key_for;
use super::store::CacheStore;

/// Sweep statistics
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepStats {
    pub scanned: usize,
    pub removed: Vec<String>,
    pub failed: usize,
}

#[derive(Clone)]
pub struct CachePolicy {
    store: CacheStore,
    sink: Arc<dyn EventSink>,
    metrics: Arc<Metrics>,
}

impl CachePolicy {
    pub fn new(store: CacheStore, sink: Arc<dyn EventSink>, metrics: Arc<Metrics>) -> Self {
        Self {
            store,
            sink,
            metrics,
        }
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// Startup sweep against the current wall clock
    pub fn startup_sweep(&self, strategy: CacheStrategy) -> Result<SweepStats> {
        self.sweep(strategy, SystemTime::now())
    }

    /// Delete entries older than the strategy's max age, relative to `now`
    ///
    /// One failed deletion does not stop the sweep; it is logged and counted.
    pub fn sweep(&self, strategy: CacheStrategy, now: SystemTime) -> Result<SweepStats> {
        let mut stats = SweepStats::default();

        let Some(max_age) = strategy.max_age() else {
            debug!(%strategy, "No time-based retention, sweep skipped");
            return Ok(stats);
        };
        let Some(cutoff) = now.checked_sub(max_age) else {
            return Ok(stats);
        };

        for entry in self.store.stamps()? {
            stats.scanned += 1;
            if entry.modified >= cutoff {
                continue;
            }

            match self.store.remove(&entry) {
                Ok(true) => {
                    self.log(format!("Auto-cleaned old cache: {}", entry.key));
                    stats.removed.push(entry.key);
                }
                Ok(false) => {}
                Err(e) => {
                    warn!(key = %entry.key, error = %e, "Failed to delete expired cache entry");
                    stats.failed += 1;
                }
            }
        }

        self.metrics.entries_evicted(stats.removed.len() as u64);
        info!(
            %strategy,
            scanned = stats.scanned,
            removed = stats.removed.len(),
            failed = stats.failed,
            "Cache sweep complete"
        );
        Ok(stats)
    }

    /// Post-run eviction; returns the key removed, if any
    pub fn after_run(&self, strategy: CacheStrategy, target: &Path) -> Option<String> {
        if strategy != CacheStrategy::Immediate {
            return None;
        }
        let key = key_for(target)?;

        match self.store.delete_entry(&key) {
            Ok(true) => {
                self.metrics.entries_evicted(1);
                self.log(format!("Auto-cleaned cache for: {}", key));
                Some(key)
            }
            Ok(false) => None,
            Err(e) => {
                warn!(key, error = %e, "Failed to clean cache after run");
                None
            }
        }
    }

    fn log(&self, message: String) {
        info!("{}", message);
        self.sink.emit(Event::Log(message));
    }
}
