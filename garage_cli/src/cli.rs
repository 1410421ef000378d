//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "garage", version, about = "Garage door controller")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/garage.toml")]
    pub config: PathBuf,

    /// Log and print as JSON lines instead of pretty
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); falls back to [logging].level
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the controller: input and webhook listeners, commands on stdin
    /// (open, close, status, quit)
    Run,
    /// Open the door and wait until every timer has settled
    Open,
    /// Close the door and wait until every timer has settled
    Close,
    /// Print the persisted door state without touching any pin
    Status,
    /// Validate config, open the store and initialize pins
    SelfCheck,
}
