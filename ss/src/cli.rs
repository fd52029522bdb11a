//! CLI argument parsing for sessionstore

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Collection inspected when none is given
pub const DEFAULT_COLLECTION: &str = "chat_sessions";

#[derive(Parser, Debug)]
#[command(name = "ss")]
#[command(author, version, about = "Inspect persisted chat sessions", long_about = None)]
pub struct Cli {
    /// Store directory (default: <data dir>/imagechat)
    #[arg(short, long)]
    pub dir: Option<PathBuf>,

    /// Collection to read from
    #[arg(short = 'C', long, default_value = DEFAULT_COLLECTION)]
    pub collection: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the most recently updated documents
    List {
        /// Maximum number of documents to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Print one document as pretty JSON
    Show {
        /// Document key
        #[arg(required = true)]
        key: String,
    },
}

/// Default store directory shared with the imagechat daemon
pub fn default_store_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("imagechat")
}
