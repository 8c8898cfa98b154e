//! docsweep CLI — crawl documentation into normalized Markdown.
//!
//! Fetches a documentation site (or local file tree) from a seed URL,
//! normalizes each page, and writes the results plus a manifest to disk.

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
