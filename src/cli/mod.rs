pub mod dashboard;
pub mod init;
pub mod report;
pub mod status;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::error::Result;
use crate::loader::DataSource;
use crate::settings::Settings;

#[derive(Parser)]
#[command(
    name = "salestrack",
    about = "Track weekly sales against a goal, fed from a spreadsheet."
)]
pub struct Cli {
    /// Settings file (default: ~/.config/salestrack/settings.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Write logs to this file instead of stderr
    #[arg(long = "log-file", global = true)]
    pub log_file: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the current report once (or on every refresh with --watch).
    Report {
        /// Emit the snapshot as JSON
        #[arg(long)]
        json: bool,
        /// Keep running and print a new report every refresh interval
        #[arg(long)]
        watch: bool,
    },
    /// Write a settings file with default values.
    Init {
        /// Use the column and status names of the Danish "Salg" worksheet
        #[arg(long)]
        danish: bool,
        /// Overwrite an existing settings file
        #[arg(long)]
        force: bool,
    },
    /// Show the active settings and data source.
    Status,
}

/// Validate the report configuration and build the data source. Both are
/// fatal for the process, so they run before any refresh.
pub(crate) fn prepare(settings: &Settings) -> Result<DataSource> {
    settings.report_config().validate()?;
    DataSource::from_settings(&settings.source)
}
