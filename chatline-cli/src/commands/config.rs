//! Config commands.

use std::path::Path;

use clap::Subcommand;
use console::style;

use chatline_core::config::AppConfig;
use chatline_core::error::{ChatError, ChatResult};

use crate::OutputFormat;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show the effective configuration.
    Show,
    /// Print the configuration file path.
    Path,
    /// Write a default configuration file.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

fn print_config_text(cfg: &AppConfig) {
    println!("{}", style("Server").bold().underlined());
    println!("  server.url                 {}", cfg.server.url);

    println!();
    println!("{}", style("Reconnect").bold().underlined());
    println!("  reconnect.base_delay_ms    {}", cfg.reconnect.base_delay_ms);
    println!("  reconnect.max_delay_ms     {}", cfg.reconnect.max_delay_ms);
    println!("  reconnect.jitter_factor    {}", cfg.reconnect.jitter_factor);
    println!("  reconnect.connect_timeout_ms {}", cfg.reconnect.connect_timeout_ms);

    println!();
    println!("{}", style("Logging").bold().underlined());
    println!("  logging.level              {}", cfg.logging.level);
    println!("  logging.directory          {}", display_or_default(&cfg.logging.directory));
    println!("  logging.json_output        {}", cfg.logging.json_output);

    println!();
    println!("{}", style("Location").bold().underlined());
    match cfg.location.coordinates() {
        Some((lat, lon)) => println!("  location                   {lat}, {lon}"),
        None => println!("  location                   {}", style("(unsupported)").dim()),
    }
}

fn display_or_default(value: &str) -> String {
    if value.is_empty() {
        style("(default)").dim().to_string()
    } else {
        value.to_string()
    }
}

/// Write a default config to `path`, refusing to clobber unless `force`.
fn init_config(path: &Path, force: bool) -> ChatResult<()> {
    if path.exists() && !force {
        return Err(ChatError::Config(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }
    AppConfig::default().save_to_file(path)
}

/// Run a config subcommand.
pub fn run(
    config: &AppConfig,
    path: &Path,
    action: ConfigAction,
    format: OutputFormat,
) -> ChatResult<()> {
    match action {
        ConfigAction::Show => match format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(config)?),
            OutputFormat::Text => print_config_text(config),
        },
        ConfigAction::Path => match format {
            OutputFormat::Json => println!(
                "{}",
                serde_json::json!({ "path": path.display().to_string(), "exists": path.exists() })
            ),
            OutputFormat::Text => {
                let note = if path.exists() { "" } else { " (not created yet)" };
                println!("{}{}", path.display(), style(note).dim());
            }
        },
        ConfigAction::Init { force } => {
            init_config(path, force)?;
            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::json!({ "path": path.display().to_string() }))
                }
                OutputFormat::Text => println!(
                    "  {} Config written to {}",
                    style("OK").green().bold(),
                    path.display()
                ),
            }
        }
    }
    Ok(())
}
