use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use colored::*;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod app;
mod config;
mod conversation;
mod grammar;
mod handler;
mod tui;
mod ui;

use app::App;
use config::{Config, API_URL_ENV};
use conversation::{Controller, FALLBACK_REPLY};
use grammar::GrammarClient;
use tui::{EventHandler, Tui, TICK_RATE};

#[derive(Parser)]
#[command(name = "grammar-tutor", version)]
#[command(about = "Chat with an AI grammar tutor from the terminal")]
struct Cli {
    /// Grammar service endpoint (overrides GRAMMAR_API_URL and the config file)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Write diagnostic logs to this file while the chat interface is running
    #[arg(long)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the chat interface (default)
    Chat,
    /// Check a single sentence and print the tutor's answer
    Check {
        /// Text to check
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// Inspect or change the saved configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the config file location and effective settings
    Show,
    /// Save the grammar service endpoint
    SetUrl {
        /// Endpoint URL, e.g. http://localhost:8000/api/grammar
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Chat);

    match &command {
        Commands::Chat => init_file_logging(cli.log_file.as_deref())?,
        _ => init_stderr_logging(),
    }

    let config = Config::load().unwrap_or_else(|e| {
        warn!(error = %e, "could not read config, using defaults");
        Config::new()
    });
    let env_url = std::env::var(API_URL_ENV).ok();
    let api_url = config.resolve_api_url(cli.api_url.as_deref(), env_url.as_deref());

    match command {
        Commands::Chat => run_tui(build_client(&api_url, &config)?).await,
        Commands::Check { text } => check_text(&build_client(&api_url, &config)?, &text.join(" ")).await,
        Commands::Config { action } => run_config(action, &config, &api_url),
    }
}

fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// The terminal belongs to the TUI, so logs only go to a file when asked for.
fn init_file_logging(path: Option<&Path>) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };

    let file = File::create(path)
        .with_context(|| format!("Failed to create log file {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter("info"))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter("warn"))
        .with_writer(std::io::stderr)
        .init();
}

fn build_client(api_url: &str, config: &Config) -> Result<GrammarClient> {
    match config.request_timeout() {
        Some(timeout) => GrammarClient::with_timeout(api_url, timeout)
            .context("Failed to build HTTP client"),
        None => Ok(GrammarClient::new(api_url)),
    }
}

async fn run_tui(client: GrammarClient) -> Result<()> {
    let api_url = client.api_url().to_string();
    info!(%api_url, "starting chat interface");

    let (notice_tx, notice_rx) = mpsc::unbounded_channel();
    let controller = Controller::new(Arc::new(client), notice_tx);
    let mut app = App::new(controller, api_url);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new(TICK_RATE, notice_rx);

    let result = run_loop(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    info!(messages = app.conversation.messages().len(), "chat interface closed");
    result
}

async fn run_loop(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event),
            None => break,
        }
    }
    Ok(())
}

async fn check_text(client: &GrammarClient, text: &str) -> Result<()> {
    let text = text.trim();
    if text.is_empty() {
        bail!("Nothing to check. Try: grammar-tutor check \"he go to school\"");
    }

    println!("{} {}", "You:".bold().cyan(), ui::escape_control(text));

    match client.check(text).await {
        Ok(result) => {
            println!("{}", "Tutor:".bold().yellow());
            println!("{}", ui::escape_control(&result));
            Ok(())
        }
        Err(e) => {
            println!("{}", "Tutor:".bold().yellow());
            println!("{}", FALLBACK_REPLY.red());
            Err(e).with_context(|| format!("Grammar service at {} failed", client.api_url()))
        }
    }
}

fn run_config(action: ConfigAction, config: &Config, api_url: &str) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let path = Config::get_config_path()?;
            println!("\n{}", "⚙️  Grammar Tutor Configuration".bold().blue());
            println!("{}", "=".repeat(40).dimmed());
            println!("{} {}", "Config file:".bold(), path.display());
            println!("{} {}", "API URL:".bold(), api_url.green());
            match config.request_timeout() {
                Some(timeout) => println!("{} {}s", "Timeout:".bold(), timeout.as_secs()),
                None => println!("{} {}", "Timeout:".bold(), "none".dimmed()),
            }
        }
        ConfigAction::SetUrl { url } => {
            let url = url.trim();
            if url.is_empty() {
                bail!("API URL cannot be empty");
            }
            Config::save_api_url(url)?;
            println!("✓ Saved API URL {}", url.green());
        }
    }
    Ok(())
}
