//! Chatline CLI - terminal front end for a self-healing chat session.
//!
//! Connects to a WebSocket chat server, renders the conversation on stdout
//! and keeps the session alive across dropped connections until the user
//! quits.

mod commands;
mod render;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{info, warn};

use chatline_core::config::AppConfig;
use chatline_core::error::ChatResult;
use chatline_core::logging;
use chatline_core::platform::Platform;

/// Chatline - a terminal chat client that reconnects on its own.
#[derive(Parser)]
#[command(
    name = "chatline",
    version,
    about = "Terminal chat over a self-healing WebSocket session",
    long_about = "A terminal chat client for a WebSocket echo-style server.\n\
                  Lost connections are retried with capped exponential backoff until you quit."
)]
struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json).
    #[arg(short = 'f', long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// One JSON document per line, for scripting.
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to the chat server and start an interactive session.
    Connect {
        /// Server URL (overrides config).
        #[arg(short, long)]
        url: Option<String>,
    },
    /// Inspect or create the configuration file.
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

/// Load the config named on the command line, or the default one.
///
/// A missing file yields the built-in defaults. Returns the config together
/// with the path it belongs to.
fn resolve_config(explicit: Option<&str>) -> ChatResult<(AppConfig, PathBuf)> {
    match explicit {
        Some(path) => {
            let path = PathBuf::from(path);
            let config = if path.exists() {
                AppConfig::load_from_file(&path)?
            } else {
                AppConfig::default()
            };
            Ok((config, path))
        }
        None => Ok((AppConfig::load_default()?, AppConfig::default_config_path()?)),
    }
}

#[tokio::main]
async fn main() -> ChatResult<()> {
    let cli = Cli::parse();

    let (config, config_path) = resolve_config(cli.config.as_deref())?;

    // Initialize logging
    let log_level = if cli.verbose {
        "debug".to_string()
    } else {
        config.logging.level.clone()
    };
    let log_dir = config
        .effective_log_dir()
        .unwrap_or_else(|_| PathBuf::from(".").join("logs"));
    let _guard = match logging::init_logging(&log_level, &log_dir, config.logging.json_output) {
        Ok(guard) => Some(guard),
        Err(e) => {
            // Keep going with stderr only, e.g. on a read-only data dir.
            logging::init_console_logging(&log_level);
            warn!("file logging unavailable in {}: {e}", log_dir.display());
            None
        }
    };

    info!(
        "Chatline CLI v{} on {}",
        chatline_core::constants::APP_VERSION,
        Platform::current()
    );

    match cli.command {
        Commands::Connect { url } => commands::connect::run(config, url, cli.format).await,
        Commands::Config { action } => {
            commands::config::run(&config, &config_path, action, cli.format)
        }
    }
}
