//! Command-line argument parsing for Sankaku Fetcher
//!
//! Defines the CLI structure using clap derive macros. CLI values override
//! the config file, which overrides the built-in defaults.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Sankaku Fetcher - archive gallery posts for a tag search
#[derive(Parser, Debug)]
#[command(
    name = "sankaku_fetcher",
    version,
    about = "Download gallery media for a Sankaku tag search",
    long_about = "Walks the listing pages of a tag search in a real browser session, resolves \
each post to its full-resolution media, and downloads the files over rate-limited HTTP. \
Existing files are never overwritten; reruns pick up where the last run left off."
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all subcommands
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Very verbose logging (debug level)
    #[arg(long, global = true)]
    pub very_verbose: bool,

    /// Quiet mode - suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Walk the configured page range and download every post's media
    Run(RunArgs),

    /// Find the last populated listing page without downloading anything
    Probe(ProbeArgs),

    /// Create a default config file in the user config directory
    Init,
}

/// Arguments for the run command
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Listing URL carrying the search query (overrides the config file)
    #[arg(short, long)]
    pub url: Option<String>,

    /// Directory media files are saved to
    #[arg(short, long, value_name = "DIR")]
    pub save_dir: Option<PathBuf>,

    /// Directory report files are written to
    #[arg(long, value_name = "DIR")]
    pub report_dir: Option<PathBuf>,

    /// First listing page to walk
    #[arg(short, long)]
    pub first_page: Option<u32>,

    /// Last listing page to walk (omit to probe for it)
    #[arg(short, long)]
    pub last_page: Option<u32>,

    /// Re-fetch existing files and compare them by digest
    #[arg(long)]
    pub compare_existing: bool,

    /// Show the browser window instead of running headless
    #[arg(long)]
    pub with_head: bool,
}

/// Arguments for the probe command
#[derive(Args, Debug, Clone)]
pub struct ProbeArgs {
    /// Listing URL carrying the search query (overrides the config file)
    #[arg(short, long)]
    pub url: Option<String>,

    /// Page to start probing from
    #[arg(short, long)]
    pub first_page: Option<u32>,

    /// Show the browser window instead of running headless
    #[arg(long)]
    pub with_head: bool,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the logging level based on global arguments
    pub fn log_level(&self) -> tracing::Level {
        if self.global.quiet {
            tracing::Level::ERROR
        } else if self.global.very_verbose {
            tracing::Level::DEBUG
        } else if self.global.verbose {
            tracing::Level::INFO
        } else {
            tracing::Level::WARN
        }
    }
}

impl RunArgs {
    /// Catch range mistakes before a browser is launched
    pub fn validate(&self) -> Result<(), String> {
        if let (Some(first), Some(last)) = (self.first_page, self.last_page) {
            if last < first {
                return Err(format!(
                    "--last-page {last} precedes --first-page {first}"
                ));
            }
        }
        if self.first_page == Some(0) || self.last_page == Some(0) {
            return Err("page numbering starts at 1".to_string());
        }
        Ok(())
    }
}
