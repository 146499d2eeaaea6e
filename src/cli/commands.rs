//! Command handlers for Sankaku Fetcher CLI
//!
//! Bridges parsed arguments to the application: loads and layers
//! configuration, launches the browser session, wires up signal-driven
//! shutdown, and runs the pipeline.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::app::{ChromeSession, HttpFetcher, Pipeline};
use crate::cli::{GlobalArgs, ProbeArgs, RunArgs};
use crate::config::AppConfig;
use crate::errors::{AppError, Result};

/// Handle the run command
///
/// Walks the configured page range, downloading every post's media and
/// writing report files at the end.
pub async fn handle_run(global: &GlobalArgs, args: RunArgs) -> Result<()> {
    args.validate().map_err(AppError::generic)?;

    let mut config = AppConfig::load(global.config.clone()).await?;
    apply_run_overrides(&mut config, &args);
    config.validate()?;

    let fetcher = HttpFetcher::new(&config.client.to_runtime_config())?;
    let session = ChromeSession::launch(!args.with_head).await?;

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    spawn_signal_listener(shutdown_tx);

    let pipeline = Pipeline::new(&session, &fetcher, config.to_pipeline_config(), shutdown_rx);
    let result = pipeline.run().await;
    session.shutdown().await;

    let report = result?;
    println!("{}", report.summary());
    if !report.failed_pages.is_empty() || !report.wrong_hash_posts.is_empty() {
        println!(
            "Report files with the details were written to {}",
            config.run.report_dir.display()
        );
    }
    Ok(())
}

/// Handle the probe command
///
/// Logs in and probes forward for the last populated listing page, without
/// downloading anything.
pub async fn handle_probe(global: &GlobalArgs, args: ProbeArgs) -> Result<()> {
    let mut config = AppConfig::load(global.config.clone()).await?;
    if let Some(url) = args.url {
        config.site.base_url = url;
    }
    if let Some(first_page) = args.first_page {
        config.run.first_page = first_page;
    }
    config.validate()?;

    let fetcher = HttpFetcher::new(&config.client.to_runtime_config())?;
    let session = ChromeSession::launch(!args.with_head).await?;
    let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);

    let spinner = probe_spinner(config.run.first_page);
    let pipeline = Pipeline::new(&session, &fetcher, config.to_pipeline_config(), shutdown_rx);
    let result = pipeline.probe().await;
    spinner.finish_and_clear();
    session.shutdown().await;

    match result? {
        Some(last_page) => println!("Last populated page: {last_page}"),
        None => println!(
            "No populated pages at or after page {}",
            config.run.first_page
        ),
    }
    Ok(())
}

/// Handle the init command: create a default config file if none exists
pub async fn handle_init() -> Result<()> {
    match AppConfig::initialize_first_run().await? {
        Some(path) => info!("Configuration file ready at {}", path.display()),
        None => warn!("No config directory available on this system"),
    }
    Ok(())
}

/// CLI values beat the config file
fn apply_run_overrides(config: &mut AppConfig, args: &RunArgs) {
    if let Some(ref url) = args.url {
        config.site.base_url = url.clone();
    }
    if let Some(ref save_dir) = args.save_dir {
        config.run.save_dir = save_dir.clone();
    }
    if let Some(ref report_dir) = args.report_dir {
        config.run.report_dir = report_dir.clone();
    }
    if let Some(first_page) = args.first_page {
        config.run.first_page = first_page;
    }
    if let Some(last_page) = args.last_page {
        config.run.last_page = Some(last_page);
    }
    if args.compare_existing {
        config.run.compare_existing = true;
    }
}

fn probe_spinner(first_page: u32) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        spinner.set_style(style.tick_strings(&["◐", "◓", "◑", "◒"]));
    }
    spinner.set_message(format!("Probing for the last page from page {first_page}..."));
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}

/// Forward Ctrl-C (and SIGTERM on Unix) to the pipeline as a shutdown
/// request. The pipeline finishes the post in flight, writes its report
/// files, and exits cleanly.
fn spawn_signal_listener(shutdown_tx: broadcast::Sender<()>) {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl-C: {}", e);
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                }
                Err(e) => error!("Failed to listen for SIGTERM: {}", e),
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => info!("Ctrl-C received, requesting shutdown"),
            _ = terminate => info!("SIGTERM received, requesting shutdown"),
        }

        let _ = shutdown_tx.send(());
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn run_args() -> RunArgs {
        RunArgs {
            url: Some("https://board.example/?tags=art".to_string()),
            save_dir: Some(PathBuf::from("/tmp/gallery")),
            report_dir: None,
            first_page: Some(2),
            last_page: Some(8),
            compare_existing: true,
            with_head: false,
        }
    }

    #[test]
    fn test_run_overrides_beat_config() {
        let mut config = AppConfig::default();
        apply_run_overrides(&mut config, &run_args());

        assert_eq!(config.site.base_url, "https://board.example/?tags=art");
        assert_eq!(config.run.save_dir, PathBuf::from("/tmp/gallery"));
        assert_eq!(config.run.first_page, 2);
        assert_eq!(config.run.last_page, Some(8));
        assert!(config.run.compare_existing);
        // untouched fields keep their defaults
        assert_eq!(config.run.report_dir, PathBuf::from("."));
    }

    #[test]
    fn test_absent_overrides_leave_config_alone() {
        let mut config = AppConfig::default();
        config.site.base_url = "https://board.example/?tags=night".to_string();
        config.run.compare_existing = false;

        let args = RunArgs {
            url: None,
            save_dir: None,
            report_dir: None,
            first_page: None,
            last_page: None,
            compare_existing: false,
            with_head: false,
        };
        apply_run_overrides(&mut config, &args);

        assert_eq!(config.site.base_url, "https://board.example/?tags=night");
        assert_eq!(config.run.first_page, 1);
        assert!(!config.run.compare_existing);
    }
}
