//! Orchestrator - supervises worker invocations

use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use super::command::WorkerLayout;
use super::progress::classify_download_line;
use super::stream::drain_lines;
use super::{Result, WorkerError};
use crate::cache::CachePolicy;
use crate::events::{Event, EventSink};
use crate::guard::RunGuard;
use crate::media::MediaKind;
use crate::observability::Metrics;
use crate::settings::{CacheStrategy, SettingsStore};

/// Outcome of a successful processing run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    pub target: PathBuf,
    pub status: ExitStatus,
    pub stdout_lines: usize,
    pub stderr_lines: usize,
}

/// Outcome of a successful model download
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadReport {
    pub progress_events: usize,
    pub status_events: usize,
    /// Whether the utility printed `DONE`
    pub done: bool,
}

/// Owns the single-flight worker lifecycle for one application session
pub struct Orchestrator {
    layout: WorkerLayout,
    guard: RunGuard,
    settings: Arc<SettingsStore>,
    policy: CachePolicy,
    sink: Arc<dyn EventSink>,
    metrics: Arc<Metrics>,
    pending_cleanup: Mutex<Vec<JoinHandle<Option<String>>>>,
}

impl Orchestrator {
    pub fn new(
        layout: WorkerLayout,
        settings: Arc<SettingsStore>,
        policy: CachePolicy,
        sink: Arc<dyn EventSink>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            layout,
            guard: RunGuard::new(),
            settings,
            policy,
            sink,
            metrics,
            pending_cleanup: Mutex::new(Vec::new()),
        }
    }

    pub fn layout(&self) -> &WorkerLayout {
        &self.layout
    }

    pub fn guard(&self) -> &RunGuard {
        &self.guard
    }

    pub fn is_running(&self) -> bool {
        self.guard.is_running()
    }

    /// Process one input file
    ///
    /// Fails fast with [`WorkerError::Busy`] while another run or download is
    /// active. Both output streams are drained to the end before the exit
    /// status is checked. The guard is released on every path, after which
    /// the `immediate` strategy schedules deletion of the input's cache entry
    /// in the background (see [`Orchestrator::wait_for_cleanup`]).
    pub async fn run(&self, target: &Path) -> Result<RunReport> {
        let Some(permit) = self.guard.try_acquire() else {
            self.metrics.run_rejected();
            self.log("A task is already running");
            return Err(WorkerError::Busy);
        };

        let run_id = Uuid::now_v7();
        let span = info_span!("run", %run_id, target = %target.display());
        self.metrics.run_started();

        let result = self.run_guarded(run_id, target).instrument(span).await;

        drop(permit);
        self.schedule_cleanup(target).await;

        match &result {
            Ok(report) => {
                self.metrics.run_succeeded();
                info!(
                    %run_id,
                    stdout_lines = report.stdout_lines,
                    stderr_lines = report.stderr_lines,
                    "Run completed"
                );
            }
            Err(e) => {
                self.metrics.run_failed();
                error!(%run_id, error = %e, "Run failed");
            }
        }
        result
    }

    async fn run_guarded(&self, run_id: Uuid, target: &Path) -> Result<RunReport> {
        let target = std::path::absolute(target)?;
        if !target.is_file() {
            self.log(format!("Input file not found: {}", target.display()));
            return Err(WorkerError::InvalidTarget(target));
        }
        self.ensure_exists("worker executable", &self.layout.executable)?;
        self.ensure_exists("entry script", &self.layout.entry_script)?;

        debug!(kind = ?MediaKind::from_path(&target), "Input accepted");
        self.log(format!("Invoking engine: {}", self.layout.executable.display()));

        let mut cmd = self
            .layout
            .run_command(&target)
            .map_err(|e| WorkerError::Spawn(std::io::Error::other(e)))?;

        let mut child = cmd.spawn().map_err(|e| {
            self.log(format!("Failed to start worker: {}", e));
            WorkerError::Spawn(e)
        })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| WorkerError::Spawn(std::io::Error::other("stdout not captured")))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| WorkerError::Spawn(std::io::Error::other("stderr not captured")))?;

        let out_sink = Arc::clone(&self.sink);
        let stdout_task = tokio::spawn(
            drain_lines(stdout, "stdout", move |line| {
                debug!(stream = "stdout", %line);
                out_sink.emit(Event::Log(line));
            })
            .in_current_span(),
        );

        let err_sink = Arc::clone(&self.sink);
        let stderr_task = tokio::spawn(
            drain_lines(stderr, "stderr", move |line| {
                debug!(stream = "stderr", %line);
                err_sink.emit(Event::Error(line));
            })
            .in_current_span(),
        );

        // Both drains must reach end-of-stream before the exit status counts
        let (stdout_lines, stderr_lines) = match tokio::join!(stdout_task, stderr_task) {
            (Ok(stdout_lines), Ok(stderr_lines)) => (stdout_lines, stderr_lines),
            (Err(e), _) | (_, Err(e)) => {
                error!(error = %e, "Output drain failed, stopping worker");
                // Kill and reap so no orphan outlives the run
                if let Err(kill_err) = child.kill().await {
                    warn!(error = %kill_err, "Failed to stop worker");
                }
                return Err(WorkerError::Io(std::io::Error::other(e)));
            }
        };

        let status = child.wait().await?;
        if !status.success() {
            self.log(format!("Worker exited with {}", status));
            return Err(WorkerError::ExitStatus(status));
        }

        Ok(RunReport {
            run_id,
            target,
            status,
            stdout_lines,
            stderr_lines,
        })
    }

    /// Fetch missing models, relaying progress on the download channels
    ///
    /// Only stdout is read. A `DONE` line emits the done event but the call
    /// still waits for the utility to exit.
    pub async fn download_models(&self) -> Result<DownloadReport> {
        let Some(_permit) = self.guard.try_acquire() else {
            self.metrics.run_rejected();
            self.log("A task is already running");
            return Err(WorkerError::Busy);
        };

        self.ensure_exists("worker executable", &self.layout.executable)?;
        self.ensure_exists("utility script", &self.layout.utility_script)?;

        let mut child = self.layout.download_command().spawn().map_err(|e| {
            self.log(format!("Failed to start model download: {}", e));
            WorkerError::Spawn(e)
        })?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| WorkerError::Spawn(std::io::Error::other("stdout not captured")))?;

        let mut report = DownloadReport::default();
        drain_lines(stdout, "stdout", |line| {
            let Some(event) = classify_download_line(&line) else {
                return;
            };
            match event {
                Event::Progress(_) => report.progress_events += 1,
                Event::Status(_) => report.status_events += 1,
                Event::Done => report.done = true,
                _ => {}
            }
            self.sink.emit(event);
        })
        .await;

        let status = child.wait().await?;
        if !status.success() {
            self.log(format!("Model download exited with {}", status));
            return Err(WorkerError::ExitStatus(status));
        }

        info!(?report, "Model download finished");
        Ok(report)
    }

    /// Identifiers of models the worker reports as missing
    ///
    /// Unlike the raw utility contract, failures are returned as errors so
    /// callers can tell "scan failed" from "nothing missing".
    pub async fn scan_models(&self) -> Result<Vec<String>> {
        self.ensure_exists("worker executable", &self.layout.executable)?;
        self.ensure_exists("utility script", &self.layout.utility_script)?;

        let output = self
            .layout
            .scan_command()
            .output()
            .await
            .map_err(WorkerError::Spawn)?;

        if !output.status.success() {
            return Err(WorkerError::ExitStatus(output.status));
        }

        let missing: Vec<String> = serde_json::from_slice(&output.stdout)?;
        debug!(count = missing.len(), "Model scan finished");
        Ok(missing)
    }

    /// Await background cache cleanups scheduled by finished runs
    ///
    /// Returns the keys that were removed.
    pub async fn wait_for_cleanup(&self) -> Vec<String> {
        let handles: Vec<_> = {
            let mut pending = self.pending_cleanup.lock().unwrap_or_else(|e| e.into_inner());
            pending.drain(..).collect()
        };

        let mut removed = Vec::new();
        for handle in handles {
            match handle.await {
                Ok(Some(key)) => removed.push(key),
                Ok(None) => {}
                Err(e) => warn!(error = %e, "Cache cleanup task failed"),
            }
        }
        removed
    }

    async fn schedule_cleanup(&self, target: &Path) {
        let strategy = self.settings.cache_strategy().await;
        if strategy != CacheStrategy::Immediate {
            return;
        }

        let policy = self.policy.clone();
        let target = target.to_path_buf();
        let handle = tokio::task::spawn_blocking(move || policy.after_run(strategy, &target));

        let mut pending = self.pending_cleanup.lock().unwrap_or_else(|e| e.into_inner());
        pending.retain(|h| !h.is_finished());
        pending.push(handle);
    }

    fn ensure_exists(&self, what: &'static str, path: &Path) -> Result<()> {
        if path.exists() {
            return Ok(());
        }
        self.log(format!("Fatal: {} not found: {}", what, path.display()));
        Err(WorkerError::MissingDependency {
            what,
            path: path.to_path_buf(),
        })
    }

    fn log(&self, message: impl Into<String>) {
        let message = message.into();
        info!("{}", message);
        self.sink.emit(Event::Log(message));
    }
}
