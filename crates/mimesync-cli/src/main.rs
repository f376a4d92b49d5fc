//! mimesync CLI - look up, extend and refresh the MIME type registry
//!
//! This is the main entry point for the `mimesync` command-line interface.
//! Each command lives in its own module under `commands`.

use anyhow::{Context, Result};
use clap::Parser;
use mimesync_core::{Config, MimeTypes};

mod cli;
mod commands;
mod output;
mod utils;

use cli::{Cli, Commands};
use utils::logging::initialize_logging;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    initialize_logging(&cli)?;

    let config = Config::load().context("Failed to load configuration")?;
    let mime_types = MimeTypes::open(&config).context("Failed to open the registry")?;

    execute_command(cli, &mime_types).await
}

async fn execute_command(cli: Cli, mime_types: &MimeTypes) -> Result<()> {
    match cli.command {
        Commands::Get { paths, format } => commands::get_types(mime_types, &paths, format)?,
        Commands::List { format } => commands::list_types(mime_types, format)?,
        Commands::Append { mime, extensions } => {
            commands::append_extensions(mime_types, &mime, &extensions)?;
        },
        Commands::Refresh { format } => commands::refresh_feeds(mime_types, format).await?,
        Commands::Watch { interval_ms } => commands::watch_feeds(mime_types, interval_ms).await?,
    }
    Ok(())
}
