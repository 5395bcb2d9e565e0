//! joincensus CLI — crawl repositories and tally join-separator literals.
//!
//! Discovers repositories through the search API, shallow-clones each one,
//! scans the clone for `.join("…")` call sites, and prints the aggregate
//! separator counts.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
