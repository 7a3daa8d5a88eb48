//! LeadScout CLI — conversational lead generation and outreach.
//!
//! Expands a business query, scrapes two listing sources, exports the
//! aggregated results, and drives the outreach email flow.

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
