//! Persisted user settings (`config.json`)
//!
//! A flat JSON object holding the cache retention strategy:
//!
//! ```json
//! {
//!   "cacheStrategy": "7days"
//! }
//! ```
//!
//! The file is read once at startup. A missing or unreadable file, malformed
//! JSON, or an unknown strategy value all fall back to [`CacheStrategy::Off`].
//! Every update rewrites the whole file.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to write settings to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unknown cache strategy '{0}' (expected off, 3days, 7days or immediate)")]
    UnknownStrategy(String),
}

pub type Result<T> = std::result::Result<T, SettingsError>;

/// Cache retention strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CacheStrategy {
    /// Keep everything until the user clears the cache
    #[default]
    Off,
    /// Sweep entries older than three days at startup
    ThreeDays,
    /// Sweep entries older than seven days at startup
    SevenDays,
    /// Delete the run's entry as soon as the run finishes
    Immediate,
}

impl CacheStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStrategy::Off => "off",
            CacheStrategy::ThreeDays => "3days",
            CacheStrategy::SevenDays => "7days",
            CacheStrategy::Immediate => "immediate",
        }
    }

    /// Maximum entry age for the time-based strategies
    pub fn max_age(&self) -> Option<Duration> {
        match self {
            CacheStrategy::ThreeDays => Some(Duration::from_secs(3 * 86_400)),
            CacheStrategy::SevenDays => Some(Duration::from_secs(7 * 86_400)),
            CacheStrategy::Off | CacheStrategy::Immediate => None,
        }
    }

    /// Lenient parse used when reading the settings file
    pub fn from_str_lossy(value: &str) -> Self {
        value.parse().unwrap_or_default()
    }
}

impl FromStr for CacheStrategy {
    type Err = SettingsError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "off" => Ok(CacheStrategy::Off),
            "3days" => Ok(CacheStrategy::ThreeDays),
            "7days" => Ok(CacheStrategy::SevenDays),
            "immediate" => Ok(CacheStrategy::Immediate),
            other => Err(SettingsError::UnknownStrategy(other.to_string())),
        }
    }
}

impl fmt::Display for CacheStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for CacheStrategy {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for CacheStrategy {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct StrategyVisitor;

        impl<'de> serde::de::Visitor<'de> for StrategyVisitor {
            type Value = CacheStrategy;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a cache strategy name")
            }

            fn visit_str<E>(self, v: &str) -> std::result::Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(CacheStrategy::from_str_lossy(v))
            }

            fn visit_unit<E>(self) -> std::result::Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(CacheStrategy::Off)
            }

            fn visit_bool<E>(self, _: bool) -> std::result::Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(CacheStrategy::Off)
            }

            fn visit_i64<E>(self, _: i64) -> std::result::Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(CacheStrategy::Off)
            }

            fn visit_u64<E>(self, _: u64) -> std::result::Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(CacheStrategy::Off)
            }

            fn visit_f64<E>(self, _: f64) -> std::result::Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(CacheStrategy::Off)
            }
        }

        deserializer.deserialize_any(StrategyVisitor)
    }
}

/// Settings persisted between sessions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub cache_strategy: CacheStrategy,
}

impl Settings {
    pub fn new(cache_strategy: CacheStrategy) -> Self {
        Self { cache_strategy }
    }
}

/// Owns the in-memory settings and their backing file
#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    current: RwLock<Settings>,
}

impl SettingsStore {
    /// Load settings from `path`, falling back to defaults on any problem
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let settings = read_settings(&path);
        info!(path = %path.display(), strategy = %settings.cache_strategy, "Settings loaded");

        Self {
            path,
            current: RwLock::new(settings),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn get(&self) -> Settings {
        *self.current.read().await
    }

    pub async fn cache_strategy(&self) -> CacheStrategy {
        self.current.read().await.cache_strategy
    }

    /// Replace the settings and rewrite the file
    ///
    /// The in-memory value is updated even if the write fails.
    pub async fn update(&self, settings: Settings) -> Result<()> {
        *self.current.write().await = settings;

        let data = serde_json::to_string_pretty(&settings)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| SettingsError::Write {
                    path: self.path.clone(),
                    source,
                })?;
        }
        tokio::fs::write(&self.path, data)
            .await
            .map_err(|source| SettingsError::Write {
                path: self.path.clone(),
                source,
            })?;

        info!(strategy = %settings.cache_strategy, "Settings saved");
        Ok(())
    }
}

fn read_settings(path: &Path) -> Settings {
    let data = match std::fs::read(path) {
        Ok(data) => data,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "No settings file, using defaults");
            return Settings::default();
        }
    };

    match serde_json::from_slice(&data) {
        Ok(settings) => settings,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Malformed settings file, using defaults");
            Settings::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_strategy_names() {
        for strategy in [
            CacheStrategy::Off,
            CacheStrategy::ThreeDays,
            CacheStrategy::SevenDays,
            CacheStrategy::Immediate,
        ] {
            assert_eq!(strategy.as_str().parse::<CacheStrategy>().unwrap(), strategy);
        }
        assert!("weekly".parse::<CacheStrategy>().is_err());
    }

    #[test]
    fn test_max_age() {
        assert_eq!(CacheStrategy::ThreeDays.max_age(), Some(Duration::from_secs(259_200)));
        assert_eq!(CacheStrategy::SevenDays.max_age(), Some(Duration::from_secs(604_800)));
        assert_eq!(CacheStrategy::Off.max_age(), None);
        assert_eq!(CacheStrategy::Immediate.max_age(), None);
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_string(&Settings::new(CacheStrategy::SevenDays)).unwrap();
        assert_eq!(json, r#"{"cacheStrategy":"7days"}"#);
    }

    #[test]
    fn test_unknown_values_become_off() {
        let cases = [
            r#"{"cacheStrategy":"forever"}"#,
            r#"{"cacheStrategy":7}"#,
            r#"{"cacheStrategy":null}"#,
            r#"{}"#,
        ];
        for case in cases {
            let settings: Settings = serde_json::from_str(case).unwrap();
            assert_eq!(settings.cache_strategy, CacheStrategy::Off, "input: {case}");
        }
    }

    #[tokio::test]
    async fn test_missing_file_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let store = SettingsStore::load(temp_dir.path().join("config.json"));
        assert_eq!(store.get().await, Settings::default());
    }

    #[tokio::test]
    async fn test_malformed_file_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        let store = SettingsStore::load(&path);
        assert_eq!(store.cache_strategy().await, CacheStrategy::Off);
    }

    #[tokio::test]
    async fn test_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");

        let store = SettingsStore::load(&path);
        let written = Settings::new(CacheStrategy::SevenDays);
        store.update(written).await.unwrap();

        let reloaded = SettingsStore::load(&path);
        assert_eq!(reloaded.get().await, written);

        let on_disk = fs::read_to_string(&path).unwrap();
        assert_eq!(on_disk, "{\n  \"cacheStrategy\": \"7days\"\n}");
    }

    #[tokio::test]
    async fn test_update_failure_keeps_memory_value() {
        let temp_dir = TempDir::new().unwrap();
        // A directory at the settings path makes the write fail
        let path = temp_dir.path().join("config.json");
        fs::create_dir(&path).unwrap();

        let store = SettingsStore::load(&path);
        let result = store.update(Settings::new(CacheStrategy::Immediate)).await;

        assert!(matches!(result, Err(SettingsError::Write { .. })));
        assert_eq!(store.cache_strategy().await, CacheStrategy::Immediate);
    }
}
