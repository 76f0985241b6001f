use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
}

/// Locations owned by the control surface itself
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PathsConfig {
    /// Root of the bundled worker installation
    #[serde(default = "default_core_dir")]
    pub core_dir: PathBuf,
    /// Per-input intermediate results, one directory per input base name
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    /// Persisted user settings (`{"cacheStrategy": ...}`)
    #[serde(default = "default_settings_file")]
    pub settings_file: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            core_dir: default_core_dir(),
            cache_dir: default_cache_dir(),
            settings_file: default_settings_file(),
        }
    }
}

fn default_core_dir() -> PathBuf {
    PathBuf::from("core")
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("core/cache")
}

fn default_settings_file() -> PathBuf {
    PathBuf::from("config.json")
}

/// Worker executable, scripts and the tool directories put on its PATH
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkerConfig {
    /// Interpreter that runs the worker scripts
    #[serde(default = "default_executable")]
    pub executable: PathBuf,
    /// Working directory for every worker invocation
    #[serde(default = "default_scripts_dir")]
    pub scripts_dir: PathBuf,
    /// Pipeline entry point, invoked with the input path
    #[serde(default = "default_entry_script")]
    pub entry_script: PathBuf,
    /// Model utility script (`--scan`, `--download`)
    #[serde(default = "default_utility_script")]
    pub utility_script: PathBuf,
    /// Bundled binaries; appended after the inherited PATH
    #[serde(default = "default_tool_root")]
    pub tool_root: PathBuf,
    /// Audio/video codec tools; first on PATH
    #[serde(default = "default_codec_dir")]
    pub codec_dir: PathBuf,
    /// Inference runtime tools; second on PATH
    #[serde(default = "default_runtime_dir")]
    pub runtime_dir: PathBuf,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            executable: default_executable(),
            scripts_dir: default_scripts_dir(),
            entry_script: default_entry_script(),
            utility_script: default_utility_script(),
            tool_root: default_tool_root(),
            codec_dir: default_codec_dir(),
            runtime_dir: default_runtime_dir(),
        }
    }
}

fn default_executable() -> PathBuf {
    if cfg!(windows) {
        PathBuf::from("core/python/python.exe")
    } else {
        PathBuf::from("core/python/bin/python3")
    }
}

fn default_scripts_dir() -> PathBuf {
    PathBuf::from("core/scripts")
}

fn default_entry_script() -> PathBuf {
    PathBuf::from("core/scripts/run.py")
}

fn default_utility_script() -> PathBuf {
    PathBuf::from("core/scripts/utils.py")
}

fn default_tool_root() -> PathBuf {
    PathBuf::from("core/bin")
}

fn default_codec_dir() -> PathBuf {
    PathBuf::from("core/bin/ffmpeg")
}

fn default_runtime_dir() -> PathBuf {
    PathBuf::from("core/bin/llama")
}
