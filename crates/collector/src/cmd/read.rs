//! Read command - Dump a log file
//!
//! # Usage
//!
//! ```bash
//! strand read /var/lib/strand/events_00003.log
//! strand read events_00003.log > events.txt
//! ```

use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use strand_sinks::LogFileReader;

/// Read command arguments
#[derive(Args, Debug)]
pub struct ReadArgs {
    /// Log file to read
    #[arg(value_name = "FILE")]
    file: PathBuf,
}

/// Print every event in the file, one per line
pub fn run(args: ReadArgs) -> Result<()> {
    let reader = LogFileReader::open(&args.file)
        .with_context(|| format!("failed to open {}", args.file.display()))?;

    let mut out = BufWriter::new(io::stdout().lock());
    for result in reader.messages() {
        let msg = result.with_context(|| format!("failed to read {}", args.file.display()))?;
        writeln!(out, "{}", msg.display_line())?;
    }
    out.flush()?;

    Ok(())
}
