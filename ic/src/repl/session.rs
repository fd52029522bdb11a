//! REPL session management

use std::path::Path;
use std::sync::Arc;

use colored::Colorize;
use eyre::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::domain::Role;
use crate::session::{ControllerError, SessionController, TurnOutcome, UploadOutcome};

/// Interactive session bound to one controller
pub struct ReplSession {
    controller: Arc<SessionController>,
}

enum SlashResult {
    Continue,
    Quit,
}

impl ReplSession {
    pub fn new(controller: Arc<SessionController>) -> Self {
        Self { controller }
    }

    /// Run the REPL main loop, flushing the session on exit
    pub async fn run(&mut self) -> Result<()> {
        let opened = self.controller.open().await?;
        self.print_welcome();
        if let Some(last) = opened.messages.last() {
            println!("{} {}", "ai:".bright_blue(), last.content);
        }
        self.print_url();

        let mut rl = DefaultEditor::new().map_err(|e| eyre::eyre!("Failed to initialize readline: {}", e))?;

        loop {
            let readline = rl.readline(&format!("{} ", ">".bright_green()));

            match readline {
                Ok(line) => {
                    let input = line.trim();
                    if input.is_empty() {
                        continue;
                    }
                    let _ = rl.add_history_entry(input);

                    if input.starts_with('/') {
                        match self.handle_slash_command(input).await {
                            SlashResult::Continue => continue,
                            SlashResult::Quit => break,
                        }
                    } else {
                        self.process_user_input(input).await;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!();
                    break;
                }
                Err(err) => {
                    self.controller.teardown();
                    return Err(eyre::eyre!("Readline error: {}", err));
                }
            }
        }

        self.controller.flush().await?;
        println!("Saved session {}", self.controller.session_id().bright_white());
        Ok(())
    }

    fn print_welcome(&self) {
        println!();
        println!("{}", "imagechat".bright_cyan().bold());
        println!("Session: {}", self.controller.session_id());
        println!("Type {} for help, {} to quit", "/help".yellow(), "/quit".yellow());
        println!();
    }

    async fn handle_slash_command(&mut self, input: &str) -> SlashResult {
        let (cmd, arg) = match input.split_once(char::is_whitespace) {
            Some((cmd, arg)) => (cmd, arg.trim()),
            None => (input, ""),
        };

        match cmd {
            "/help" | "/h" => self.print_help(),
            "/quit" | "/q" | "/exit" => return SlashResult::Quit,
            "/undo" | "/u" => match self.controller.undo() {
                Some(_) => {
                    self.print_last_reply();
                    self.print_url();
                }
                None => println!("{}", "Nothing to undo.".dimmed()),
            },
            "/new" => {
                self.controller.clear();
                self.print_last_reply();
            }
            "/image" if !arg.is_empty() => match self.controller.set_image_url(arg) {
                Ok(image) => {
                    println!("{} {}", "image:".bright_blue(), image);
                    self.print_url();
                }
                Err(e) => println!("{} {}", "Error:".red(), e),
            },
            "/upload" if !arg.is_empty() => self.upload(Path::new(arg)).await,
            "/url" => self.print_url(),
            "/history" => self.print_history(),
            "/image" | "/upload" => println!("{} {} needs an argument", "?".yellow(), cmd),
            _ => {
                println!("{} Unknown command: {}", "?".yellow(), cmd);
                println!("Type {} for available commands", "/help".yellow());
            }
        }
        SlashResult::Continue
    }

    fn print_help(&self) {
        println!();
        println!("{}", "Available Commands:".bright_cyan());
        println!("  {:16} Show this help", "/help".yellow());
        println!("  {:16} Save and exit", "/quit".yellow());
        println!("  {:16} Revert the last applied edit", "/undo".yellow());
        println!("  {:16} Start over with no image", "/new".yellow());
        println!("  {:16} Use an already-hosted image", "/image <url>".yellow());
        println!("  {:16} Upload a local image file", "/upload <file>".yellow());
        println!("  {:16} Show the current image URL", "/url".yellow());
        println!("  {:16} Show the conversation", "/history".yellow());
        println!();
        println!("Anything else is treated as an edit request.");
        println!();
    }

    fn print_history(&self) {
        println!();
        for msg in self.controller.messages() {
            let role = match msg.role {
                Role::User => "you:".bright_green(),
                Role::Assistant => "ai:".bright_blue(),
            };
            println!("  {} {}", role, msg.content);
        }
        println!();
    }

    fn print_last_reply(&self) {
        if let Some(msg) = self.controller.messages().last() {
            println!("{} {}", "ai:".bright_blue(), msg.content);
        }
    }

    fn print_url(&self) {
        match self.controller.render_url() {
            Some(url) if url.starts_with("data:") => println!("{} {}", "url:".dimmed(), "(local preview)".dimmed()),
            Some(url) => println!("{} {}", "url:".dimmed(), url),
            None => println!("{}", "No image yet. Use /image <url> or /upload <file>.".dimmed()),
        }
    }

    async fn process_user_input(&mut self, input: &str) {
        match self.controller.send(input).await {
            Ok(outcome) => {
                let label = match &outcome {
                    TurnOutcome::Applied { .. } => "ai:".bright_blue(),
                    TurnOutcome::NotUnderstood { .. } => "ai:".yellow(),
                    TurnOutcome::Failed { .. } => "ai:".red(),
                };
                println!("{} {}", label, outcome.reply());
                if matches!(outcome, TurnOutcome::Applied { .. }) {
                    self.print_url();
                }
            }
            Err(ControllerError::EmptyMessage) => {}
            Err(e) => println!("{} {}", "Error:".red(), e),
        }
    }

    async fn upload(&mut self, path: &Path) {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                println!("{} Failed to read {}: {}", "Error:".red(), path.display(), e);
                return;
            }
        };
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        println!("{}", format!("Uploading {}...", file_name).dimmed());
        match self.controller.upload(&file_name, bytes).await {
            Ok(UploadOutcome::Uploaded(image)) => {
                self.print_last_reply();
                println!("{} {}", "image:".bright_blue(), image);
            }
            Ok(UploadOutcome::PreviewOnly) => self.print_last_reply(),
            Ok(UploadOutcome::Superseded) => println!("{}", "Image changed during upload; result discarded.".dimmed()),
            Err(e) => println!("{} {}", "Error:".red(), e),
        }
    }
}
