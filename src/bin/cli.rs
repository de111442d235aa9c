//! Media calendar CLI
//!
//! Local execution entry point, meant to be invoked repeatedly by cron or a
//! similar scheduler. Only one run may target a storage directory at a time.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use chrono::Utc;
use clap::{Parser, Subcommand};
use media_calendar::{
    error::Result,
    models::{Config, FEED_URL_ENV},
    pipeline::{self, CalendarWindow},
    storage::{CacheRepository, JsonCacheFile, MediaCache},
    utils::http,
};

/// Media release calendar generator
#[derive(Parser, Debug)]
#[command(
    name = "media-calendar",
    version,
    about = "Builds a release-date calendar from a media tracking feed"
)]
struct Cli {
    /// Path to storage directory containing config, cache, and calendar
    #[arg(short, long, default_value = "storage", global = true)]
    storage_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Append the log to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ingest the feed, backfill undated records, and save the cache
    Update,

    /// Regenerate the calendar file from the current cache
    Calendar,

    /// Run full pipeline: Update → Calendar
    Run,

    /// Validate configuration
    Validate,

    /// Show cache statistics
    Info,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level));
    builder.format_timestamp_secs();

    if let Some(path) = log_file {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    builder.init();
    Ok(())
}

/// Load the cache snapshot without running the pipeline.
async fn load_cache(config: &Config, storage_dir: &Path) -> MediaCache {
    JsonCacheFile::new(config.cache.path(storage_dir)).load().await
}

/// Main entry point for the CLI application.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_file.as_deref())?;

    log::info!("Media calendar starting...");

    // Load configurations
    let config_path = cli.storage_dir.join("config.toml");
    let mut config = Config::load_or_default(&config_path);
    config.apply_env();

    log::info!("Loaded configuration from {}", cli.storage_dir.display());

    match cli.command {
        Command::Update => {
            let client = http::create_client(&config.crawler)?;
            pipeline::run_update(&config, &cli.storage_dir, &client).await?;
            log::info!("Update complete!");
        }

        Command::Calendar => {
            let cache = load_cache(&config, &cli.storage_dir).await;
            pipeline::run_calendar(&config.calendar, &cli.storage_dir, &cache, Utc::now())
                .await?;
            log::info!("Calendar complete!");
        }

        Command::Run => {
            let client = http::create_client(&config.crawler)?;

            log::info!("Step 1/2: Updating cache...");
            let (cache, _report) = pipeline::run_update(&config, &cli.storage_dir, &client).await?;

            log::info!("Step 2/2: Generating calendar...");
            pipeline::run_calendar(&config.calendar, &cli.storage_dir, &cache, Utc::now())
                .await?;

            log::info!("Pipeline complete!");
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            if config.feed.url.is_none() {
                log::warn!(
                    "No feed URL configured; set feed.url or {} to ingest items",
                    FEED_URL_ENV
                );
            }

            log::info!("All validations passed!");
        }

        Command::Info => {
            log::info!("Storage directory: {}", cli.storage_dir.display());

            let cache = load_cache(&config, &cli.storage_dir).await;
            let window = CalendarWindow::from_config(&config.calendar, Utc::now())?;
            let upcoming = pipeline::project(&cache, &window);

            log::info!("Cached records: {}", cache.len());
            log::info!("Dated: {}", cache.dated_count());
            log::info!("Undated: {}", cache.undated_links().len());
            log::info!("Events in window: {}", upcoming.len());
            for event in &upcoming {
                let local = event.start.with_timezone(window.now.offset());
                log::debug!("  {} {}", local.format("%Y-%m-%d"), event.name);
            }
        }
    }

    log::info!("Done!");

    Ok(())
}
