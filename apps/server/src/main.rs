//! Kiln server — an on-demand package repository.
//!
//! Serves a Maven-style repository tree over HTTP; artifacts that are not
//! yet present are built on first request from their registered recipe
//! (clone, checkout, build, harvest) and cached on disk.

mod cli;
mod http;

use clap::Parser;
use color_eyre::eyre::Result;

use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    cli::init_tracing(&cli);
    cli::run(cli).await
}
