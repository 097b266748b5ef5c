mod catalog;
mod cli;
mod model;
#[cfg(feature = "tui")]
mod orchestrator;
mod scenarios;
mod tracker;
#[cfg(feature = "tui")]
mod tui;

use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    cli::run(args).await
}
