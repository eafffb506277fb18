use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use catalog_loader::{ui_channel, LoaderSettings, LoadingCoordinator};
use clap::Parser;
use library_tree::BookFormats;
use log::LevelFilter;
use loader_logging::{loader_debug, loader_info};

use crate::catalog::DirectoryCatalog;
use crate::config::{load_config, DEFAULT_CONFIG_FILENAME};
use crate::logging::{LogDestination, DEFAULT_LOG_FILENAME};

/// Scan a local book folder in the background and stream what it finds.
#[derive(Parser, Debug, Clone)]
#[command(name = "loader_app", version)]
pub struct CliArgs {
    /// Folder to scan
    #[arg(value_name = "ROOT", default_value = ".")]
    pub root: PathBuf,

    /// RON config file
    #[arg(long, value_name = "FILE", default_value = DEFAULT_CONFIG_FILENAME)]
    pub config: PathBuf,

    /// Minimum time between UI updates, overrides the config
    #[arg(long, value_name = "MS")]
    pub interval_ms: Option<u64>,

    /// Ask the scan to stop after this long
    #[arg(long, value_name = "MS")]
    pub interrupt_after_ms: Option<u64>,

    /// Where log records go
    #[arg(long, value_enum, default_value_t = LogDestination::Terminal)]
    pub log: LogDestination,

    /// Most verbose level that gets logged (off, error, warn, info, debug, trace)
    #[arg(long, value_name = "LEVEL", default_value_t = LevelFilter::Info)]
    pub log_level: LevelFilter,

    /// File used when logging to a file
    #[arg(long, value_name = "FILE", default_value = DEFAULT_LOG_FILENAME)]
    pub log_file: PathBuf,
}

pub fn run_app(args: CliArgs) -> anyhow::Result<()> {
    let config = load_config(&args.config);
    let interval_ms = args.interval_ms.unwrap_or(config.update_interval_ms);
    let settings =
        LoaderSettings::default().with_update_interval(Duration::from_millis(interval_ms));
    let formats = if config.extensions.is_empty() {
        BookFormats::default()
    } else {
        BookFormats::new(&config.extensions)
    };

    loader_debug!("book extensions: {}", formats.book_extensions().join(", "));

    let catalog = DirectoryCatalog::new(&args.root, formats)
        .with_item_delay(Duration::from_millis(config.item_delay_ms));
    let (ui, queue) = ui_channel();
    let coordinator = LoadingCoordinator::new(catalog, ui, settings);
    coordinator.register_on_finish(|| loader_info!("library view can close the progress indicator"));

    let worker = coordinator
        .spawn()
        .context("failed to start the loader thread")?;

    if let Some(delay_ms) = args.interrupt_after_ms {
        let interrupt = coordinator.interrupt_handle();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(delay_ms));
            interrupt.request();
        });
    }

    // This thread owns the UI: deliveries and the finish report run here.
    queue.run_until(|| worker.is_finished());
    let summary = worker
        .join()
        .map_err(|_| anyhow!("loader thread panicked"))??;

    loader_info!(
        "{} books shown, {} in partially listed folders",
        coordinator.loader().shown(),
        coordinator.loader().unfinished().len()
    );
    if let Some(message) = summary.error_message {
        bail!("scan of {} failed: {message}", args.root.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_and_file_come_from_flags() {
        let args = CliArgs::try_parse_from([
            "loader_app",
            "books",
            "--log",
            "both",
            "--log-level",
            "debug",
            "--log-file",
            "scan.log",
        ])
        .unwrap();
        assert_eq!(args.root, PathBuf::from("books"));
        assert_eq!(args.log, LogDestination::Both);
        assert_eq!(args.log_level, LevelFilter::Debug);
        assert_eq!(args.log_file, PathBuf::from("scan.log"));
    }

    #[test]
    fn logging_defaults_to_terminal_at_info() {
        let args = CliArgs::try_parse_from(["loader_app"]).unwrap();
        assert_eq!(args.log, LogDestination::Terminal);
        assert_eq!(args.log_level, LevelFilter::Info);
        assert_eq!(args.log_file, PathBuf::from(DEFAULT_LOG_FILENAME));
    }
}
