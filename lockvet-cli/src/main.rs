//! lockvet CLI entry point
//!
//! Parses arguments, initialises logging, and dispatches to the
//! subcommand handlers. Errors are printed to stderr and mapped to
//! process exit codes via [`CliError::exit_code`].

mod cli;
mod commands;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::error::CliError;
use crate::output::OutputWriter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_logging(cli.log_level.as_deref());

    let writer = OutputWriter::new(cli.output);
    if let Err(e) = run(cli, &writer).await {
        eprintln!("error: {e}");
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli, writer: &OutputWriter) -> Result<(), CliError> {
    match cli.command {
        Commands::Scan(args) => commands::scan::execute(args, &cli.config, writer).await,
        Commands::Fetch(args) => commands::fetch::execute(args, &cli.config, writer).await,
        Commands::History(args) => commands::history::execute(args, &cli.config, writer).await,
        Commands::Show(args) => commands::show::execute(args, &cli.config, writer).await,
        Commands::Config(args) => commands::config::execute(args, &cli.config, writer).await,
    }
}

/// Initialise tracing. `RUST_LOG` wins over the `--log-level` flag;
/// logs go to stderr so stdout stays clean for command output.
fn init_logging(level: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level.unwrap_or("warn")))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
