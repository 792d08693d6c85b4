//! CLI subcommands

pub mod read;
pub mod search;
pub mod serve;
