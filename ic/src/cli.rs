//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// imagechat - conversational image editing
#[derive(Parser)]
#[command(
    name = "ic",
    about = "Describe image edits in plain language and get CDN transformation URLs",
    version,
    after_help = "Logs are written to: ~/.local/share/imagechat/logs/imagechat.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level override (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(short, long, global = true, help = "Log level override")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP server
    Serve {
        /// Address to bind, overriding the config
        #[arg(short, long)]
        bind: Option<String>,

        /// Also log to stderr
        #[arg(long)]
        stderr: bool,
    },

    /// Edit an image interactively in a named session
    Chat {
        /// Session id (a new one is generated when omitted)
        session: Option<String>,
    },

    /// Translate one request and print the descriptors
    Translate {
        /// The edit request in plain language
        text: String,
    },

    /// Show a stored session
    History {
        /// Session id
        session: String,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// List recently updated sessions
    Sessions {
        /// Maximum number of sessions to show
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Print the rendered image URL of a stored session
    Render {
        /// Session id
        session: String,
    },
}

/// Output format for history/sessions commands
#[derive(Clone, Debug, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use: text or json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Where the log file lives
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("imagechat")
        .join("logs")
        .join("imagechat.log")
}
