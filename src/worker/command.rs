//! Worker command construction
//!
//! The worker runs with its scripts directory as the working directory, so
//! every configured path is made absolute up front.

use std::ffi::{OsStr, OsString};
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;

use crate::config::WorkerConfig;

/// Suppresses the console window the worker would otherwise open on Windows
#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

pub const DOWNLOAD_FLAG: &str = "--download";
pub const SCAN_FLAG: &str = "--scan";

/// Worker paths, all absolute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerLayout {
    pub executable: PathBuf,
    pub scripts_dir: PathBuf,
    pub entry_script: PathBuf,
    pub utility_script: PathBuf,
    pub tool_root: PathBuf,
    pub codec_dir: PathBuf,
    pub runtime_dir: PathBuf,
}

impl WorkerLayout {
    /// Resolve configured paths against the current working directory
    pub fn resolve(config: &WorkerConfig) -> io::Result<Self> {
        Ok(Self {
            executable: std::path::absolute(&config.executable)?,
            scripts_dir: std::path::absolute(&config.scripts_dir)?,
            entry_script: std::path::absolute(&config.entry_script)?,
            utility_script: std::path::absolute(&config.utility_script)?,
            tool_root: std::path::absolute(&config.tool_root)?,
            codec_dir: std::path::absolute(&config.codec_dir)?,
            runtime_dir: std::path::absolute(&config.runtime_dir)?,
        })
    }

    /// Executable search path for the worker
    ///
    /// `codec_dir` and `runtime_dir` go first, then the inherited entries in
    /// their original order, then `tool_root`.
    pub fn search_path(&self, inherited: Option<&OsStr>) -> Result<OsString, std::env::JoinPathsError> {
        let mut dirs = vec![self.codec_dir.clone(), self.runtime_dir.clone()];
        if let Some(inherited) = inherited {
            dirs.extend(std::env::split_paths(inherited));
        }
        dirs.push(self.tool_root.clone());
        std::env::join_paths(dirs)
    }

    /// `<exe> <script> <arg>` with the worker conventions applied
    ///
    /// stdin is closed and stdout is piped; stderr is left to the caller.
    pub fn command(&self, script: &Path, arg: impl AsRef<OsStr>) -> Command {
        let mut cmd = Command::new(&self.executable);
        cmd.arg(script)
            .arg(arg)
            .current_dir(&self.scripts_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped());

        #[cfg(windows)]
        cmd.creation_flags(CREATE_NO_WINDOW);

        cmd
    }

    /// Command for a processing run against `target`
    pub fn run_command(&self, target: &Path) -> Result<Command, std::env::JoinPathsError> {
        let path = self.search_path(std::env::var_os("PATH").as_deref())?;

        let mut cmd = self.command(&self.entry_script, target);
        cmd.stderr(Stdio::piped()).env("PATH", path);
        Ok(cmd)
    }

    pub fn download_command(&self) -> Command {
        let mut cmd = self.command(&self.utility_script, DOWNLOAD_FLAG);
        cmd.stderr(Stdio::null());
        cmd
    }

    pub fn scan_command(&self) -> Command {
        let mut cmd = self.command(&self.utility_script, SCAN_FLAG);
        cmd.stderr(Stdio::null());
        cmd
    }
}
