//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// Treewire document synchronization CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (defaults apply when omitted)
    #[arg(short = 'C', long, global = true, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Enable verbose output for debugging
    #[arg(short = 'V', long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Attach a local document to a remote peer and run the sync loop
    #[command(visible_alias = "c")]
    Connect {
        /// WebSocket endpoint (ws://)
        #[arg(value_hint = clap::ValueHint::Url)]
        url: String,

        /// HTML file providing the initial document snapshot
        #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
        doc: PathBuf,

        /// Process-supplied arguments for the handshake frame
        #[arg(short, long)]
        args: Option<String>,

        /// Handshake path (default: "/" + document file name)
        #[arg(short, long)]
        path: Option<String>,
    },

    /// Parse a document and dump its node table as JSON
    #[command(visible_alias = "i")]
    Inspect {
        /// HTML file to inspect
        #[arg(value_hint = clap::ValueHint::FilePath)]
        doc: PathBuf,

        /// Pretty-print JSON output
        #[arg(short, long)]
        pretty: bool,
    },
}
