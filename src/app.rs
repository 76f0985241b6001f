//! Session-wide application state
//!
//! One [`App`] exists per session. It wires the settings store, cache policy
//! and orchestrator together and exposes the operations a front end calls.

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::cache::{CacheError, CacheInfo, CachePolicy, CacheStore, SweepStats};
use crate::config::Config;
use crate::events::EventSink;
use crate::observability::Metrics;
use crate::settings::{Settings, SettingsError, SettingsStore};
use crate::worker::command::WorkerLayout;
use crate::worker::{DownloadReport, Orchestrator, RunReport, WorkerError};

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Worker(#[from] WorkerError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error("Failed to resolve worker layout: {0}")]
    Layout(#[source] std::io::Error),
}

#[derive(Clone)]
pub struct App {
    pub config: Arc<Config>,
    pub settings: Arc<SettingsStore>,
    pub policy: CachePolicy,
    pub orchestrator: Arc<Orchestrator>,
    pub metrics: Arc<Metrics>,
}

impl App {
    /// Build the session state and load persisted settings
    pub fn new(config: Config, sink: Arc<dyn EventSink>) -> Result<Self, AppError> {
        let metrics = Arc::new(Metrics::new());
        let settings = Arc::new(SettingsStore::load(&config.paths.settings_file));
        let layout = WorkerLayout::resolve(&config.worker).map_err(AppError::Layout)?;

        let cache_root = std::path::absolute(&config.paths.cache_dir).map_err(AppError::Layout)?;
        let policy = CachePolicy::new(
            CacheStore::new(cache_root),
            Arc::clone(&sink),
            Arc::clone(&metrics),
        );

        let orchestrator = Arc::new(Orchestrator::new(
            layout,
            Arc::clone(&settings),
            policy.clone(),
            sink,
            Arc::clone(&metrics),
        ));

        Ok(Self {
            config: Arc::new(config),
            settings,
            policy,
            orchestrator,
            metrics,
        })
    }

    /// Startup hook: apply the time-based retention sweep
    ///
    /// Sweep failures are logged, never fatal.
    pub async fn startup(&self) -> SweepStats {
        let strategy = self.settings.cache_strategy().await;
        let policy = self.policy.clone();

        match tokio::task::spawn_blocking(move || policy.startup_sweep(strategy)).await {
            Ok(Ok(stats)) => stats,
            Ok(Err(e)) => {
                warn!(error = %e, "Startup cache sweep failed");
                SweepStats::default()
            }
            Err(e) => {
                warn!(error = %e, "Startup cache sweep task failed");
                SweepStats::default()
            }
        }
    }

    pub async fn get_settings(&self) -> Settings {
        self.settings.get().await
    }

    pub async fn set_settings(&self, settings: Settings) -> Result<(), AppError> {
        info!(strategy = %settings.cache_strategy, "Updating settings");
        Ok(self.settings.update(settings).await?)
    }

    pub fn cache_info(&self) -> CacheInfo {
        self.policy.store().inspect()
    }

    pub fn clear_cache(&self) -> Result<(), AppError> {
        Ok(self.policy.store().clear()?)
    }

    pub fn delete_cache_entry(&self, key: &str) -> Result<bool, AppError> {
        Ok(self.policy.store().delete_entry(key)?)
    }

    pub async fn run(&self, target: &Path) -> Result<RunReport, AppError> {
        Ok(self.orchestrator.run(target).await?)
    }

    pub async fn download_models(&self) -> Result<DownloadReport, AppError> {
        Ok(self.orchestrator.download_models().await?)
    }

    pub async fn scan_models(&self) -> Result<Vec<String>, AppError> {
        Ok(self.orchestrator.scan_models().await?)
    }
}
