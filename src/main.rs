//! Sankaku Fetcher CLI application
//!
//! Command-line interface for archiving gallery media from Sankaku tag
//! searches. Walks listing pages in a browser session and downloads each
//! post's full-resolution media over rate-limited HTTP.

use std::process;

use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use sankaku_fetcher::cli::{handle_init, handle_probe, handle_run, Cli, Commands};
use sankaku_fetcher::errors::Result;

#[tokio::main]
async fn main() {
    let result = run().await;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Main application logic
async fn run() -> Result<()> {
    // Load environment variables from .env file if it exists
    dotenv::dotenv().ok();

    let cli = Cli::parse_args();
    init_logging(&cli);

    info!("Sankaku Fetcher v{} starting", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Run(args) => {
            info!("Executing run command");
            handle_run(&cli.global, args).await
        }
        Commands::Probe(args) => {
            info!("Executing probe command");
            handle_probe(&cli.global, args).await
        }
        Commands::Init => {
            info!("Executing init command");
            handle_init().await
        }
    }
}

/// Initialize logging based on CLI verbosity settings
fn init_logging(cli: &Cli) {
    let log_level = cli.log_level();

    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = format!("sankaku_fetcher={}", log_level).parse() {
        filter = filter.add_directive(directive);
    }

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(cli.global.very_verbose)
        .init();

    if cli.global.very_verbose {
        info!("Very verbose logging enabled");
    } else if cli.global.verbose {
        info!("Verbose logging enabled");
    }
}
