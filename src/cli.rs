// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

use crate::types::RunPolicy;

/// Config file looked up under the project root when `--config` is absent.
pub const DEFAULT_CONFIG: &str = "Quickscope.toml";

/// Command-line arguments for `quickscope`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "quickscope",
    version,
    about = "Watch test files and re-run only the ones whose dependencies changed.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML, or a `package.json` with a
    /// `config.quickscope` object).
    ///
    /// Relative paths are resolved against the project root.
    #[arg(long, short = 'c', value_name = "PATH", default_value = DEFAULT_CONFIG)]
    pub config: String,

    /// Project root. Defaults to the nearest ancestor of the current directory
    /// that contains `.git`, `.hg`, `package.json` or `Quickscope.toml`.
    #[arg(long, value_name = "DIR")]
    pub root: Option<String>,

    /// Target glob(s), overriding `files` from the config.
    #[arg(long = "files", value_name = "GLOB")]
    pub files: Vec<String>,

    /// Command template, overriding `cmd` from the config.
    #[arg(long, value_name = "CMD")]
    pub cmd: Option<String>,

    /// What to do with a run requested while another is in flight.
    #[arg(long, value_name = "POLICY")]
    pub run_policy: Option<RunPolicy>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `QUICKSCOPE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Run every target once and exit with the command's status.
    #[arg(long)]
    pub once: bool,

    /// Print targets and their resolved dependencies, run nothing.
    #[arg(long)]
    pub dry_run: bool,
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
