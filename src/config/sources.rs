use super::models::Config;
use config::{ConfigError, Environment, File};
use std::env;
use std::path::PathBuf;

const CONFIG_ENV_VAR: &str = "AISMR_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/aismr.toml";
const ENV_PREFIX: &str = "AISMR";
const ENV_SEPARATOR: &str = "__";

/// Load configuration from multiple sources with priority:
/// 1. Defaults (embedded in structs)
/// 2. TOML file (if exists)
/// 3. Environment variables from .env file (via dotenvy)
/// 4. System environment variables (highest priority)
pub fn load() -> Result<Config, ConfigError> {
    // .env is optional
    let _ = dotenvy::dotenv();

    let config_path = env::var(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

    load_from_sources(config_path)
}

/// Load configuration from a specific path and environment
pub fn load_from_sources(config_path: PathBuf) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();

    if config_path.exists() {
        tracing::info!("Loading configuration from: {}", config_path.display());
        builder = builder.add_source(File::from(config_path).required(false));
    } else {
        tracing::debug!(
            "Configuration file not found at {}, using defaults and environment overrides",
            config_path.display()
        );
    }

    // AISMR__WORKER__EXECUTABLE -> worker.executable
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator(ENV_SEPARATOR)
            .try_parsing(true),
    );

    let config = builder.build()?;
    config.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_defaults_only() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nonexistent.toml");

        let config = load_from_sources(config_path).unwrap();
        assert_eq!(config.paths.settings_file, PathBuf::from("config.json"));
    }

    // Environment overrides are not exercised here: set_var is unsafe under
    // the parallel test runner.

    #[test]
    fn test_load_from_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let toml_content = r#"
[paths]
core_dir = "/opt/aismr/core"
cache_dir = "/var/cache/aismr"
settings_file = "/etc/aismr/config.json"

[worker]
executable = "/opt/aismr/core/python/bin/python3"
scripts_dir = "/opt/aismr/core/scripts"
entry_script = "/opt/aismr/core/scripts/run.py"
codec_dir = "/usr/lib/ffmpeg/bin"
        "#;

        fs::write(&config_path, toml_content).unwrap();

        let config = load_from_sources(config_path).unwrap();
        assert_eq!(config.paths.cache_dir, PathBuf::from("/var/cache/aismr"));
        assert_eq!(config.worker.codec_dir, PathBuf::from("/usr/lib/ffmpeg/bin"));
        // Unset keys keep their defaults
        assert_eq!(config.worker.runtime_dir, PathBuf::from("core/bin/llama"));
    }
}
