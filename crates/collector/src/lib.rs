//! Strand - Server assembly
//!
//! Wires the ingestion buffer, the UDP source, the log file rotator, the
//! viewer fan-out and the control server into one runnable unit.
//!
//! # Example
//!
//! ```ignore
//! use strand_collector::{Collector, ServerContext};
//! use strand_config::Config;
//!
//! let config = Config::from_file("configs/config.toml")?;
//! let collector = Collector::start(ServerContext::from_config(config)?).await?;
//! // ... wait for a shutdown signal
//! collector.shutdown().await;
//! ```

mod context;
mod error;
mod runtime;
mod search;

pub use context::ServerContext;
pub use error::{Result, StartupError};
pub use runtime::{Collector, ShutdownReport};
pub use search::search_log_files;
