use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;

use sessionstore::Store;
use sessionstore::cli::{Cli, Command, default_store_dir};

fn setup_logging() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();
    Ok(())
}

fn format_ms(ms: i64) -> String {
    let secs = ms / 1000;
    format!("{}s ago", (sessionstore::now_ms() / 1000 - secs).max(0))
}

fn main() -> Result<()> {
    setup_logging().context("Failed to setup logging")?;

    let cli = Cli::parse();
    let dir = cli.dir.unwrap_or_else(default_store_dir);

    info!("sessionstore opening {}", dir.display());
    let store = Store::open(&dir).context(format!("Failed to open store at {}", dir.display()))?;

    match cli.command {
        Command::List { limit } => {
            let docs = store.recent(&cli.collection, limit)?;
            if docs.is_empty() {
                println!("No documents found");
            } else {
                for doc in docs {
                    let messages = doc.body.get("messages").and_then(|v| v.as_array()).map_or(0, Vec::len);
                    let steps = doc
                        .body
                        .get("transformations")
                        .and_then(|v| v.as_array())
                        .map_or(0, Vec::len);
                    println!(
                        "{} {} messages, {} transformations, updated {}",
                        doc.key.cyan(),
                        messages,
                        steps,
                        format_ms(doc.updated_at).dimmed()
                    );
                }
            }
        }
        Command::Show { key } => match store.get(&cli.collection, &key)? {
            Some(doc) => {
                println!("{}", serde_json::to_string_pretty(&doc.body)?);
            }
            None => {
                println!("{} No document with key: {}", "✗".red(), key);
            }
        },
    }

    Ok(())
}
