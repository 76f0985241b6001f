mod cli;

use std::sync::Arc;
use std::time::SystemTime;

use aismr::app::App;
use aismr::config::Config;
use aismr::events::{ChannelSink, Event};
use aismr::humanize::format_age;
use aismr::observability;
use aismr::settings::Settings;
use clap::Parser;
use cli::{CacheAction, Cli, Commands, SettingsAction};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::warn;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[tokio::main]
async fn main() -> Result<(), AnyError> {
    observability::init();

    let cli = Cli::parse();
    let config = Config::load()?;

    let (sink, events) = ChannelSink::new();
    let printer = tokio::spawn(print_events(events, cli.json));

    let app = App::new(config, Arc::new(sink))?;
    app.startup().await;

    let result = execute(&app, cli.command).await;

    app.orchestrator.wait_for_cleanup().await;
    tracing::debug!(metrics = ?app.metrics.snapshot(), "Session finished");

    // Closing the last sink ends the printer
    drop(app);
    printer.await?;

    result
}

async fn execute(app: &App, command: Commands) -> Result<(), AnyError> {
    match command {
        Commands::Run { path } => {
            app.run(&path).await?;
        }
        Commands::DownloadModels => {
            app.download_models().await?;
        }
        Commands::ScanModels => {
            // A failed scan reports nothing missing, with a warning
            let missing = app.scan_models().await.unwrap_or_else(|e| {
                warn!(error = %e, "Model scan failed");
                Vec::new()
            });
            println!("{}", serde_json::to_string(&missing)?);
        }
        Commands::Cache { action } => cache_command(app, action).await?,
        Commands::Settings { action } => match action {
            SettingsAction::Show => {
                println!("{}", serde_json::to_string_pretty(&app.get_settings().await)?);
            }
            SettingsAction::Set { strategy } => {
                app.set_settings(Settings::new(strategy)).await?;
            }
        },
        Commands::Config => {
            print!("{}", app.config.to_toml_string()?);
        }
    }
    Ok(())
}

async fn cache_command(app: &App, action: CacheAction) -> Result<(), AnyError> {
    match action {
        CacheAction::Info => {
            let info = app.cache_info();
            println!(
                "{} ({}{})",
                info.path.display(),
                info.total_bytes,
                if info.exists { "" } else { ", missing" }
            );
        }
        CacheAction::List => {
            let now = SystemTime::now();
            for entry in app.policy.store().entries()? {
                let age = now.duration_since(entry.modified).unwrap_or_default();
                let modified = OffsetDateTime::from(entry.modified).format(&Rfc3339)?;
                println!(
                    "{:<40} {:>10} {:>6}  {}",
                    entry.key,
                    entry.size.to_string(),
                    format_age(age),
                    modified
                );
            }
        }
        CacheAction::Clear => {
            app.clear_cache()?;
            println!("Success");
        }
        CacheAction::Sweep => {
            let stats = app.startup().await;
            println!("Removed {} of {} entries", stats.removed.len(), stats.scanned);
        }
        CacheAction::Delete { key } => {
            if !app.delete_cache_entry(&key)? {
                println!("No cache entry named '{}'", key);
            }
        }
    }
    Ok(())
}

async fn print_events(mut events: UnboundedReceiver<Event>, json: bool) {
    while let Some(event) = events.recv().await {
        if json {
            match serde_json::to_string(&event.to_envelope()) {
                Ok(line) => println!("{}", line),
                Err(e) => warn!(error = %e, "Failed to encode event"),
            }
            continue;
        }

        match event {
            Event::Done => println!("DONE"),
            other => {
                if let Some(text) = other.payload().as_str() {
                    println!("{}", text);
                }
            }
        }
    }
}
