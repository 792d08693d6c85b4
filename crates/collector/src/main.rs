//! Strand - Telemetry ingestion and live viewer fan-out
//!
//! # Usage
//!
//! ```bash
//! # Run the server (default)
//! strand
//! strand --config configs/config.toml
//!
//! # Inspect stored events
//! strand read /var/lib/strand/events_00000.log
//! strand search --max-level 2 --command stop
//! ```

mod cmd;

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use strand_config::{LogConfig, LogFormat, LogOutput};

/// Strand - Telemetry ingestion and live viewer fan-out
#[derive(Parser, Debug)]
#[command(name = "strand")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (error if specified but not found)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Log level or filter directive. Overrides config file.
    #[arg(short, long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the server
    Serve(cmd::serve::ServeArgs),

    /// Print every event in a log file
    Read(cmd::read::ReadArgs),

    /// Search stored log files with a filter
    Search(cmd::search::SearchArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Command::Serve(args)) => {
            // Subcommand --config wins over the global one
            let path = args.config.or(cli.config);
            serve(path.as_deref(), cli.log_level.as_deref()).await
        }
        Some(Command::Read(args)) => {
            // Read doesn't need logging - just outputs to stdout
            cmd::read::run(args)
        }
        Some(Command::Search(args)) => {
            let config = cmd::serve::load_config(cli.config.as_deref())?;
            cmd::search::run(args, config.log_files.path)
        }
        // No subcommand = run server
        None => serve(cli.config.as_deref(), cli.log_level.as_deref()).await,
    }
}

async fn serve(config_path: Option<&Path>, log_level: Option<&str>) -> Result<()> {
    let config = cmd::serve::load_config(config_path)?;
    init_logging(&config.log, log_level)?;
    cmd::serve::run(config).await
}

/// Initialize the tracing subscriber for logging
fn init_logging(log: &LogConfig, override_level: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_new(log.filter_directive(override_level))
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    let writer = match &log.output {
        LogOutput::Stdout => BoxMakeWriter::new(std::io::stdout),
        LogOutput::Stderr => BoxMakeWriter::new(std::io::stderr),
        LogOutput::File(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {path}"))?;
            BoxMakeWriter::new(Arc::new(file))
        }
    };
    let ansi = log.output.is_terminal();

    let registry = tracing_subscriber::registry().with(filter);
    match log.format {
        LogFormat::Console => registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_ansi(ansi)
                    .with_writer(writer),
            )
            .init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(writer))
            .init(),
    }

    Ok(())
}
