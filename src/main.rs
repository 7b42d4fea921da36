#![forbid(unsafe_code)]

mod color;
mod config;
mod constants;
mod content;
mod drag;
mod ipc;
mod layer;
mod markup;
mod orchestrator;
mod overlay;
mod scheduler;
mod style;
mod surface;
mod types;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn, Level as TraceLevel};
use tracing_subscriber::FmtSubscriber;

use config::{JsonSettingsStore, SettingsKey};
use ipc::{OverlayClient, OverlayRequest, OverlayResponse};

#[derive(Parser, Debug)]
#[command(name = "hadith-overlay")]
#[command(about = "Desktop overlay showing a random hadith with translations")]
#[command(version)]
struct Cli {
    /// Settings file path
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the overlay daemon (default)
    Run {
        /// Hadith library (JSON list of entries)
        #[arg(long)]
        content: Option<PathBuf>,
    },
    /// Change one setting and tell the running daemon
    Set { key: String, value: String },
    /// Print one setting, or all of them
    Get { key: Option<String> },
    /// Ask the daemon to re-read the settings file
    Reload,
    /// Show a different hadith now
    Refresh,
    /// Stop the daemon
    Quit,
    /// Check whether the daemon is running
    Ping,
}

fn init_logging() -> Result<()> {
    let log_level = match std::env::var("LOG_LEVEL")
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "warn" => TraceLevel::WARN,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to install log subscriber")
}

/// Send one request to the running daemon
fn send(request: OverlayRequest) -> Result<OverlayResponse> {
    let mut client = OverlayClient::connect().context("Overlay daemon is not running")?;
    client.request(&request)
}

fn expect_ready(request: OverlayRequest) -> Result<()> {
    match send(request)? {
        OverlayResponse::Ready | OverlayResponse::Pong => Ok(()),
        OverlayResponse::Error(message) => anyhow::bail!("daemon refused request: {message}"),
    }
}

fn main() -> Result<()> {
    init_logging()?;
    let cli = Cli::parse();
    let settings_path = cli.settings.unwrap_or_else(JsonSettingsStore::default_path);

    match cli.command.unwrap_or(Command::Run { content: None }) {
        Command::Run { content: library } => {
            let content_path = library.unwrap_or_else(content::default_path);
            info!(
                content = %content_path.display(),
                settings = %settings_path.display(),
                "Starting hadith-overlay"
            );
            overlay::run_daemon(content_path, settings_path)
        }
        Command::Set { key, value } => {
            let key: SettingsKey = key.parse()?;
            let mut store = JsonSettingsStore::open(settings_path);
            store.set_from_str(key, &value)?;
            println!("{key} = {}", store.value(key));
            if let Err(e) = expect_ready(OverlayRequest::SettingsChanged) {
                warn!(error = %e, "Saved, but the running overlay was not notified");
            }
            Ok(())
        }
        Command::Get { key } => {
            let store = JsonSettingsStore::open(settings_path);
            match key {
                Some(key) => {
                    let key: SettingsKey = key.parse()?;
                    println!("{}", store.value(key));
                }
                None => {
                    for key in SettingsKey::ALL {
                        println!("{key} = {}", store.value(key));
                    }
                }
            }
            Ok(())
        }
        Command::Reload => expect_ready(OverlayRequest::SettingsChanged),
        Command::Refresh => expect_ready(OverlayRequest::Refresh),
        Command::Quit => expect_ready(OverlayRequest::Shutdown),
        Command::Ping => {
            expect_ready(OverlayRequest::Ping)?;
            println!("pong");
            Ok(())
        }
    }
}
