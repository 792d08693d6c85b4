//! Search command - Filter stored events
//!
//! Applies the same constraints as a live viewer filter to every event in a
//! log directory.
//!
//! # Usage
//!
//! ```bash
//! strand search --dir /var/lib/strand --max-level 2
//! strand search --app 6f1c2b8e-93a1-4d7e-9a55-0c2f4b1d8e70 --command stop
//! strand search --domain 10.1.0.0/255.255.0.0 --from 2026-01-01T00:00:00Z
//! ```

use std::io::{self, BufWriter, Write};
use std::net::Ipv4Addr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;

use strand_collector::search_log_files;
use strand_protocol::{Command, FilterSpec, FilterState, Uuid};

/// Search command arguments
#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Log directory (defaults to `log_files.path` from the configuration)
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// Application key
    #[arg(long)]
    app: Option<Uuid>,

    /// Domain as BASE/MASK, dotted quads or integers
    #[arg(long, value_parser = parse_domain)]
    domain: Option<(u32, u32)>,

    /// Highest level to include
    #[arg(long)]
    max_level: Option<i32>,

    /// Transaction id (repeatable)
    #[arg(long = "transaction")]
    transactions: Vec<Uuid>,

    /// Command (none, normal, start, stop)
    #[arg(long)]
    command: Option<Command>,

    /// Earliest server timestamp (RFC 3339, inclusive)
    #[arg(long)]
    from: Option<DateTime<Utc>>,

    /// Latest server timestamp (RFC 3339, inclusive)
    #[arg(long)]
    to: Option<DateTime<Utc>>,
}

impl SearchArgs {
    fn filter(&self) -> FilterSpec {
        let mut spec = FilterSpec::new(FilterState::Search);
        if let Some(app) = self.app {
            spec = spec.with_application(app);
        }
        if let Some((base, mask)) = self.domain {
            spec = spec.with_domain(base, mask);
        }
        if let Some(level) = self.max_level {
            spec = spec.with_max_level(level);
        }
        if !self.transactions.is_empty() {
            spec = spec.with_transactions(self.transactions.iter().copied());
        }
        if let Some(command) = self.command {
            spec = spec.with_command(command);
        }
        spec.with_time_range(self.from, self.to)
    }
}

/// Print matching events, one per line
pub fn run(args: SearchArgs, default_dir: PathBuf) -> Result<()> {
    let dir = args.dir.clone().unwrap_or(default_dir);
    let found = search_log_files(&dir, &args.filter())
        .with_context(|| format!("failed to search {}", dir.display()))?;

    let mut out = BufWriter::new(io::stdout().lock());
    for msg in &found {
        writeln!(out, "{}", msg.display_line())?;
    }
    out.flush()?;

    eprintln!("{} matching events", found.len());
    Ok(())
}

fn parse_domain(s: &str) -> Result<(u32, u32), String> {
    let (base, mask) = s
        .split_once('/')
        .ok_or_else(|| format!("expected BASE/MASK, got '{s}'"))?;
    Ok((parse_domain_part(base)?, parse_domain_part(mask)?))
}

fn parse_domain_part(s: &str) -> Result<u32, String> {
    if let Ok(value) = s.parse::<u32>() {
        return Ok(value);
    }
    s.parse::<Ipv4Addr>()
        .map(u32::from)
        .map_err(|_| format!("invalid domain component '{s}'"))
}
