//! Command-line interface components
//!
//! CLI-specific code for the Sankaku Fetcher application: argument parsing
//! and the command handlers that wire arguments into the pipeline.

pub mod args;
pub mod commands;

pub use args::{Cli, Commands, GlobalArgs, ProbeArgs, RunArgs};
pub use commands::{handle_init, handle_probe, handle_run};
