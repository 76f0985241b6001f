//! External worker supervision
//!
//! The worker is an interpreter plus a script, treated as a black box that
//! takes a path argument and prints lines. Three invocations exist:
//!
//! - run: `<exe> <entry script> <input>`, stdout and stderr relayed as log events
//! - download: `<exe> <utility script> --download`, stdout classified by prefix
//! - scan: `<exe> <utility script> --scan`, stdout parsed as a JSON string array
//!
//! Runs and downloads share one [`RunGuard`](crate::guard::RunGuard), so at
//! most one of them executes at a time.

pub mod command;
pub mod progress;
pub mod runner;
pub mod stream;

use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

pub use progress::classify_download_line;
pub use runner::{DownloadReport, Orchestrator, RunReport};

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("A task is already running")]
    Busy,

    #[error("Required {what} not found: {}", .path.display())]
    MissingDependency { what: &'static str, path: PathBuf },

    #[error("Input file not found: {}", .0.display())]
    InvalidTarget(PathBuf),

    #[error("Failed to start worker: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Worker exited with {0}")]
    ExitStatus(ExitStatus),

    #[error("Failed to parse scan output: {0}")]
    ScanOutput(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn is_busy(&self) -> bool {
        matches!(self, WorkerError::Busy)
    }
}

pub type Result<T> = std::result::Result<T, WorkerError>;
