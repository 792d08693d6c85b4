//! Serve command - Run the strand server

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use tokio::signal;
use tracing::{info, warn};

use strand_collector::{Collector, ServerContext};
use strand_config::Config;

/// Serve command arguments
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Path to configuration file (defaults to configs/config.toml if present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Resolve the configuration for `serve`
///
/// An explicit path must exist; otherwise the default locations are tried
/// and built-in defaults used if none is found.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    if let Some(path) = path {
        if !path.exists() {
            anyhow::bail!("config file not found: {}", path.display());
        }
        return Config::from_file(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()));
    }

    for candidate in [Path::new("configs/config.toml"), Path::new("config.toml")] {
        if candidate.exists() {
            return Config::from_file(candidate).with_context(|| {
                format!("failed to load configuration from {}", candidate.display())
            });
        }
    }

    Ok(Config::default())
}

/// Run the server until Ctrl-C or SIGTERM
pub async fn run(config: Config) -> Result<()> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        platform = std::env::consts::OS,
        arch = std::env::consts::ARCH,
        "strand starting"
    );

    let ctx = ServerContext::from_config(config).context("failed to build server context")?;
    let collector = Collector::start(ctx)
        .await
        .context("failed to start server")?;

    wait_for_shutdown().await;
    info!("shutdown signal received, stopping server...");

    collector.shutdown().await;
    info!("strand shutdown complete");
    Ok(())
}

/// Wait for Ctrl-C or SIGTERM
async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
