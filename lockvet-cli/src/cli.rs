//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's
//! derive macros. It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Lockvet -- dependency vulnerability scanner for lockfiles.
///
/// Use `lockvet <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "lockvet", version, about, long_about = None)]
pub struct Cli {
    /// Path to the lockvet.toml configuration file.
    #[arg(short, long, default_value = "lockvet.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table / text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan a directory's lockfiles against the local advisory cache.
    Scan(ScanArgs),

    /// Fetch advisories from upstream feeds into the local cache.
    Fetch(FetchArgs),

    /// Show recent scan history.
    History(HistoryArgs),

    /// Show details of a single advisory by ID.
    Show(ShowArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- scan ----

/// Scan a project directory.
#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Directory to scan (default: current directory).
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Minimum severity that causes a non-zero exit (low, medium, high, critical).
    #[arg(long, default_value = "low")]
    pub min_severity: String,
}

// ---- fetch ----

/// Fetch advisories into the local cache.
#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Ecosystems to fetch (comma-separated, e.g. "npm,pypi"). Empty = all.
    #[arg(long, value_delimiter = ',')]
    pub ecosystems: Vec<String>,
}

// ---- history ----

/// Show recent scan history.
#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Maximum number of history rows to show.
    #[arg(long)]
    pub limit: Option<u32>,
}

// ---- show ----

/// Show a single advisory.
#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Advisory ID (e.g. CVE-2021-23337 or GHSA-35jh-r3h4-6jhm).
    pub id: String,
}

// ---- config ----

/// Manage lockvet configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, cache, scan).
        #[arg(long)]
        section: Option<String>,
    },
}
