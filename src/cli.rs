// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `medallion`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "medallion",
    version,
    about = "Materialize declarative bronze/silver/gold tables with data-quality expectations.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the pipeline definition (TOML).
    #[arg(long, value_name = "PATH", default_value_os_t = crate::config::default_config_path())]
    pub config: PathBuf,

    /// Run the built-in Wikipedia clickstream pipeline instead of a
    /// definition file, optionally reading the given JSON file.
    #[arg(
        long,
        value_name = "PATH",
        num_args = 0..=1,
        default_missing_value = crate::clickstream::DEFAULT_JSON_PATH,
        conflicts_with = "config"
    )]
    pub clickstream: Option<PathBuf>,

    /// Refresh only this table plus the tables it reads from.
    #[arg(long, value_name = "NAME")]
    pub table: Vec<String>,

    /// Persist tables and the event log here (overrides `[pipeline].storage`).
    #[arg(long, value_name = "DIR")]
    pub storage: Option<PathBuf>,

    /// Validate and print the plan without materializing anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Print the first N rows of every materialized table.
    #[arg(long, value_name = "N")]
    pub show: Option<usize>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `MEDALLION_LOG` or `info` is used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
