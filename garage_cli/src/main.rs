#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod cli;
mod door;
mod error_fmt;

use std::path::Path;

use clap::Parser;
use eyre::WrapErr;
use garage_core::TargetState;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

/// Console layer on stderr (pretty or JSON), optional JSON-lines file layer.
/// `RUST_LOG` overrides the level.
fn init_tracing(json: bool, level: &str, logging: &garage_config::Logging) -> eyre::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .wrap_err_with(|| format!("invalid log level {level:?}"))?;

    let pretty = (!json).then(|| fmt::layer().with_writer(std::io::stderr).with_target(false));
    let json_console = json.then(|| fmt::layer().json().with_writer(std::io::stderr));

    let file = match logging.file.as_deref() {
        Some(path) => {
            let path = Path::new(path);
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| eyre::eyre!("logging.file {} has no file name", path.display()))?;
            let appender = match logging.rotation.as_deref().unwrap_or("never") {
                "daily" => tracing_appender::rolling::daily(dir, name),
                "hourly" => tracing_appender::rolling::hourly(dir, name),
                _ => tracing_appender::rolling::never(dir, name),
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            Some(fmt::layer().json().with_ansi(false).with_writer(writer))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(pretty)
        .with(json_console)
        .with(file)
        .try_init()
        .map_err(|e| eyre::eyre!("init tracing: {e}"))
}

fn real_main(cli: Cli) -> eyre::Result<()> {
    let cfg = door::load_config(&cli.config)?;
    let level = cli
        .log_level
        .clone()
        .or_else(|| cfg.logging.level.clone())
        .unwrap_or_else(|| "info".to_string());
    init_tracing(cli.json, &level, &cfg.logging)?;
    tracing::debug!(config = %cli.config.display(), "configuration loaded");

    match cli.cmd {
        Commands::Run => {
            let status = door::run_daemon(&cfg)?;
            tracing::info!(current = %status.current, target = %status.target, "stopped");
        }
        Commands::Open => {
            let status = door::run_command(&cfg, TargetState::Open)?;
            door::print_status(&cfg.name, &status);
        }
        Commands::Close => {
            let status = door::run_command(&cfg, TargetState::Closed)?;
            door::print_status(&cfg.name, &status);
        }
        Commands::Status => {
            let status = door::read_status(&cfg)?;
            door::print_status(&cfg.name, &status);
        }
        Commands::SelfCheck => {
            door::self_check(&cfg)?;
            println!("ok");
        }
    }
    Ok(())
}

fn main() {
    let _ = color_eyre::install();
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(e) = real_main(cli) {
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&e));
        } else {
            eprintln!("{}", humanize(&e));
        }
        std::process::exit(exit_code_for_error(&e));
    }
}
