use aismr::settings::CacheStrategy;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "aismr")]
#[command(about = "Run the subtitle pipeline and manage its cache", long_about = None)]
pub struct Cli {
    /// Print events as JSON lines instead of plain text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Process one media file
    Run {
        /// Input audio or video file
        path: PathBuf,
    },
    /// Download missing models
    DownloadModels,
    /// List models that still need downloading
    ScanModels,
    /// Inspect or clean the result cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
    /// Show or change persisted settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Print the effective configuration
    Config,
}

#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// Cache location and total size
    Info,
    /// Entries with size and age
    List,
    /// Delete everything
    Clear,
    /// Apply the configured time-based retention now
    Sweep,
    /// Delete a single entry
    Delete {
        /// Entry key (input file name without extension)
        key: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum SettingsAction {
    Show,
    Set {
        /// off, 3days, 7days or immediate
        strategy: CacheStrategy,
    },
}
