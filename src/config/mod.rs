//! Application layout configuration
//!
//! Where the worker installation, its tool directories, the cache root and the
//! settings file live. Loaded from:
//! 1. Default values (embedded in structs, relative to the working directory)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! This is separate from the user-editable [`settings`](crate::settings),
//! which only holds the cache strategy.
//!
//! # Usage
//!
//! ```no_run
//! use aismr::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Cache root: {}", config.paths.cache_dir.display());
//! ```
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the pattern:
//! `AISMR__<section>__<key>`
//!
//! Examples:
//! - `AISMR__WORKER__EXECUTABLE=/usr/bin/python3`
//! - `AISMR__PATHS__CACHE_DIR=/var/cache/aismr`
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/aismr.toml`.
//! This can be overridden using the `AISMR_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

pub use models::{Config, PathsConfig, WorkerConfig};
pub use validation::ValidationError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),

    #[error("Failed to render configuration: {0}")]
    RenderError(#[from] toml::ser::Error),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file is malformed or validation
    /// fails.
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Effective configuration as TOML
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_load_minimal_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        fs::write(&config_path, "[paths]\ncache_dir = \"/tmp/aismr-cache\"\n").unwrap();

        let config = Config::load_from_path(config_path).unwrap();
        assert_eq!(config.paths.cache_dir, PathBuf::from("/tmp/aismr-cache"));
    }

    #[test]
    fn test_validation_runs_on_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        fs::write(&config_path, "[paths]\ncache_dir = \"core\"\n").unwrap();

        let result = Config::load_from_path(config_path);
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::ValidationError(ValidationError::InsideCacheDir { .. })
        ));
    }

    #[test]
    fn test_toml_render_round_trip() {
        let rendered = Config::default().to_toml_string().unwrap();
        assert!(rendered.contains("[worker]"));

        let parsed: Config = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.worker.entry_script, PathBuf::from("core/scripts/run.py"));
    }
}
