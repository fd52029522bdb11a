//! imagechat - conversational image editing
//!
//! CLI entry point for the HTTP server, the interactive REPL and session
//! inspection.

use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use tracing::info;
use tracing_subscriber::fmt::writer::MakeWriterExt;

use imagechat::cli::{Cli, Command, OutputFormat, get_log_path};
use imagechat::config::Config;
use imagechat::domain::{ImageReference, Role};
use imagechat::render::{ImageKitRenderer, Renderer};
use imagechat::server;
use imagechat::state::SessionStore;

/// Resolve the log level: CLI flag, then config file, then INFO
fn resolve_log_level(cli_level: Option<&str>, config_level: Option<&str>) -> tracing::Level {
    cli_level
        .or(config_level)
        .and_then(|s| tracing::Level::from_str(s).ok())
        .unwrap_or(tracing::Level::INFO)
}

fn setup_logging(level: tracing::Level, stderr: bool) -> Result<()> {
    let log_path = get_log_path();
    if let Some(log_dir) = log_path.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    // Write to the log file so REPL output stays clean
    let log_file = Arc::new(fs::File::create(&log_path).context("Failed to create log file")?);
    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

    if stderr {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr.and(log_file))
            .with_ansi(false)
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(log_file)
            .with_ansi(false)
            .with_env_filter(filter)
            .init();
    }

    info!("Logging initialized (level: {})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_level = Config::load_log_level(cli.config.as_ref());
    let level = resolve_log_level(cli.log_level.as_deref(), config_level.as_deref());
    let stderr = matches!(cli.command, Some(Command::Serve { stderr: true, .. }));
    setup_logging(level, stderr).context("Failed to setup logging")?;

    let mut config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    info!(
        "imagechat loaded config: provider={}, model={}",
        config.llm.provider, config.llm.model
    );

    match cli.command {
        Some(Command::Serve { bind, .. }) => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            cmd_serve(&config).await
        }
        Some(Command::Chat { session }) => imagechat::repl::run_interactive(&config, session).await,
        Some(Command::Translate { text }) => cmd_translate(&config, &text).await,
        Some(Command::History { session, format }) => cmd_history(&config, &session, format).await,
        Some(Command::Sessions { limit, format }) => cmd_sessions(&config, limit, format).await,
        Some(Command::Render { session }) => cmd_render(&config, &session).await,
        None => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            cmd.print_help()?;
            println!();
            Ok(())
        }
    }
}

/// Run the HTTP server in the foreground
async fn cmd_serve(config: &Config) -> Result<()> {
    config.validate()?;
    println!("Serving on {} (Ctrl+C to stop)", config.server.bind.bright_white());
    server::serve(config).await
}

/// Translate a single request and print the resulting params
async fn cmd_translate(config: &Config, text: &str) -> Result<()> {
    config.validate()?;
    let translator = server::build_translator(config)?;

    match translator.translate(text).await {
        Ok(translation) => {
            if translation.is_empty() {
                eprintln!("{}", "Nothing understood.".yellow());
            }
            println!("{}", serde_json::to_string_pretty(&translation.params())?);
            Ok(())
        }
        Err(e) => {
            if let Some(details) = e.details() {
                eprintln!("{} {}", "details:".dimmed(), details);
            }
            Err(eyre::eyre!(e))
        }
    }
}

fn open_store(config: &Config) -> Result<SessionStore> {
    let dir = PathBuf::from(&config.storage.db_dir);
    SessionStore::spawn(&dir, 1).context("Failed to open session store")
}

/// Print one stored session
async fn cmd_history(config: &Config, session_id: &str, format: OutputFormat) -> Result<()> {
    let store = open_store(config)?;
    let session = store.load(session_id).await;
    store.close().await;
    let session = session?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&session)?),
        OutputFormat::Text => {
            println!("Session {}", session.session_id.bright_white());
            println!("Image: {}", session.image_url.as_deref().unwrap_or("(none)"));
            println!(
                "Transformations: {} (undo depth {})",
                session.transformations.len(),
                session.transformation_history.len()
            );
            println!();
            if session.messages.is_empty() {
                println!("{}", "No messages.".dimmed());
            }
            for msg in &session.messages {
                let role = match msg.role {
                    Role::User => "you:".bright_green(),
                    Role::Assistant => "ai:".bright_blue(),
                };
                println!("  {} {}", role, msg.content);
            }
        }
    }
    Ok(())
}

/// List recently updated sessions
async fn cmd_sessions(config: &Config, limit: usize, format: OutputFormat) -> Result<()> {
    let store = open_store(config)?;
    let sessions = store.recent(limit).await;
    store.close().await;
    let sessions = sessions?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&sessions)?),
        OutputFormat::Text => {
            if sessions.is_empty() {
                println!("No sessions found.");
                return Ok(());
            }
            println!("{:38} {:>8} {:>6}  IMAGE", "SESSION", "MESSAGES", "STEPS");
            for s in &sessions {
                println!(
                    "{:38} {:>8} {:>6}  {}",
                    s.session_id,
                    s.message_count,
                    s.transformation_count,
                    s.image_url.as_deref().unwrap_or("-")
                );
            }
        }
    }
    Ok(())
}

/// Print the rendered URL of a stored session
async fn cmd_render(config: &Config, session_id: &str) -> Result<()> {
    let store = open_store(config)?;
    let session = store.load(session_id).await;
    store.close().await;
    let session = session?;

    let image = session
        .image_url
        .as_deref()
        .and_then(|raw| ImageReference::parse(raw, &config.imagekit.url_endpoint))
        .ok_or_else(|| eyre::eyre!("Session {} has no image", session_id))?;

    println!("{}", ImageKitRenderer::new().render(&image, &session.transformations));
    Ok(())
}
