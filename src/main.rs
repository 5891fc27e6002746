//! qprobe: debug probes for tenant networks.
//!
//! Parses the command line, loads configuration, builds a probe agent for
//! this host and runs one subcommand. Diagnostics go to stderr through
//! `tracing`; probe lifecycle events go to syslog.

use anyhow::{Context, Result};
use clap::Parser;
use qprobe::{cli::Cli, cli_handler, config::ConfigLoader};
use tracing::debug;

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose)?;

    debug!("Parsed CLI arguments: {:?}", cli.command);

    let config = ConfigLoader::new()
        .load(&cli)
        .context("Failed to load configuration")?;

    let agent = cli_handler::build_agent(&config)?;

    let stdout = std::io::stdout();
    cli_handler::handle_command(&agent, cli.command, &mut stdout.lock())
}

/// Initialize the tracing subscriber for diagnostic logging.
///
/// # Verbosity Levels
/// - 0 (default): Only warnings and errors
/// - 1 (-v): Info level
/// - 2 (-vv): Debug level
/// - 3+ (-vvv): Trace level
fn init_tracing(verbose: u8) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    Ok(())
}
