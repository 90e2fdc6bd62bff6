mod cli;
mod error;
mod fmt;
mod importer;
mod loader;
mod models;
mod reports;
mod scheduler;
mod settings;
mod tui;

use std::path::{Path, PathBuf};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use error::Result;
use settings::{default_log_path, default_settings_path, load_settings};

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// The dashboard owns the terminal, so its logs go to a file. Everything
/// else logs to stderr unless a file is requested.
fn init_logging(log_file: Option<&Path>) -> Result<()> {
    match log_file {
        Some(path) => {
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir)?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let settings_path = cli.config.unwrap_or_else(default_settings_path);

    let command = match cli.command {
        Some(Commands::Init { danish, force }) => {
            return cli::init::run(&settings_path, danish, force);
        }
        other => other,
    };

    let settings = load_settings(&settings_path);
    let log_file: Option<PathBuf> = match (&command, cli.log_file) {
        (_, Some(path)) => Some(path),
        (None, None) => Some(
            settings
                .as_ref()
                .ok()
                .and_then(|s| s.log_file.as_deref())
                .map(settings::shellexpand_path)
                .unwrap_or_else(default_log_path),
        ),
        (Some(_), None) => None,
    };
    init_logging(log_file.as_deref())?;
    let settings = settings?;

    match command {
        None => cli::dashboard::run(settings),
        Some(Commands::Report { json, watch }) => cli::report::run(&settings, json, watch),
        Some(Commands::Status) => cli::status::run(&settings, &settings_path),
        Some(Commands::Init { danish, force }) => cli::init::run(&settings_path, danish, force),
    }
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
