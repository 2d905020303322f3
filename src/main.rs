//! Treewire - client-side document tree synchronization over WebSocket.

mod address;
mod cli;
mod config;
mod connection;
mod dispatch;
mod document;
mod event;
mod logger;
mod protocol;
mod tree;
mod upload;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::SyncConfig;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }

    logger::set_verbose(cli.verbose);

    let config = SyncConfig::load(cli.config.as_deref())?;

    match &cli.command {
        Commands::Connect {
            url,
            doc,
            args,
            path,
        } => cli::connect::run(url, doc, args.as_deref(), path.as_deref(), &config),
        Commands::Inspect { doc, pretty } => cli::inspect::run(doc, *pretty, &config),
    }
}
