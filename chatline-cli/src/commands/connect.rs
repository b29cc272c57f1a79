//! Connect command - run an interactive chat session.

use std::sync::Arc;

use console::style;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info};

use chatline_core::config::AppConfig;
use chatline_core::constants::EVENT_CHANNEL_CAPACITY;
use chatline_core::error::{ChatError, ChatResult};
use chatline_socket::location::provider_from_config;
use chatline_socket::{
    ChatClient, ConversationLog, EventDispatcher, FanoutSink, SessionDriver, SessionSettings,
};

use crate::render::Renderer;
use crate::OutputFormat;

const HELP: &str = "Type a message and press Enter. Commands: /geo [lat lon], /history, \
                    /status, /help, /quit. Start a line with // to send a literal slash.";

/// One line of user input.
#[derive(Debug, Clone, PartialEq)]
enum Input {
    Text(String),
    /// Share a location; `None` asks the configured provider.
    Geo(Option<(f64, f64)>),
    History,
    Status,
    Help,
    Quit,
    Invalid(String),
}

fn parse_input(line: &str) -> Input {
    let trimmed = line.trim();
    if let Some(escaped) = trimmed.strip_prefix("//") {
        return Input::Text(format!("/{escaped}"));
    }
    let Some(command) = trimmed.strip_prefix('/') else {
        return Input::Text(line.to_string());
    };

    let mut parts = command.split_whitespace();
    match parts.next().unwrap_or_default() {
        "geo" => {
            let args: Vec<&str> = parts.collect();
            match args.as_slice() {
                [] => Input::Geo(None),
                [lat, lon] => parse_coordinates(lat, lon),
                _ => Input::Invalid("usage: /geo [lat lon]".into()),
            }
        }
        "history" => Input::History,
        "status" => Input::Status,
        "help" | "?" => Input::Help,
        "quit" | "exit" => Input::Quit,
        other => Input::Invalid(format!("unknown command /{other}, try /help")),
    }
}

fn parse_coordinates(lat: &str, lon: &str) -> Input {
    let (Ok(latitude), Ok(longitude)) = (lat.parse::<f64>(), lon.parse::<f64>()) else {
        return Input::Invalid("coordinates must be decimal degrees".into());
    };
    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return Input::Invalid("latitude must be within ±90 and longitude within ±180".into());
    }
    Input::Geo(Some((latitude, longitude)))
}

/// Run the connect command.
pub async fn run(
    mut config: AppConfig,
    url: Option<String>,
    format: OutputFormat,
) -> ChatResult<()> {
    if let Some(url) = url {
        config.server.url = AppConfig::sanitize_server_url(&url);
    }
    if let Err(e) = config.validate() {
        error!("invalid configuration: {e}");
        return Err(e);
    }

    let renderer = Renderer::new(format);
    let dispatcher = EventDispatcher::new(EVENT_CHANNEL_CAPACITY);
    let mut events = dispatcher.subscribe();
    let log = Arc::new(ConversationLog::new());
    let sink = FanoutSink::new()
        .with(Arc::new(dispatcher))
        .with(log.clone());

    let settings = SessionSettings::from_config(&config);
    if !renderer.is_json() {
        println!(
            "{} {}",
            style("Chatline").bold(),
            style(format!("-> {}", settings.url)).dim()
        );
        renderer.hint(HELP);
        println!();
    }

    let location = provider_from_config(&config.location);
    let (client, handle) = SessionDriver::spawn(settings, Arc::new(sink), location);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => renderer.event(&event)?,
                Err(RecvError::Lagged(n)) => {
                    renderer.warning(&format!("Missed {n} events (slow terminal)"));
                }
                Err(RecvError::Closed) => break,
            },
            line = lines.next_line() => match line? {
                Some(line) => {
                    if !handle_input(&client, &log, &renderer, parse_input(&line)).await? {
                        break;
                    }
                }
                None => {
                    debug!("stdin closed");
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                debug!("interrupted");
                break;
            }
        }
    }

    let snapshot = client.shutdown().await?;
    drop(client);
    handle
        .await
        .map_err(|e| ChatError::Internal(format!("session task failed: {e}")))?;
    info!("session with {} ended in state {}", snapshot.url, snapshot.state);
    renderer.hint("Disconnected.");
    Ok(())
}

/// Act on one input line. Returns false when the user asked to quit.
async fn handle_input(
    client: &ChatClient,
    log: &ConversationLog,
    renderer: &Renderer,
    input: Input,
) -> ChatResult<bool> {
    match input {
        // Outcome is rendered by the session itself.
        Input::Text(text) => {
            client.send_text(text).await?;
        }
        Input::Geo(Some((latitude, longitude))) => {
            client.send_geo_probe(latitude, longitude).await?;
        }
        Input::Geo(None) => {
            client.share_location().await?;
        }
        Input::History => renderer.history(&log.records())?,
        Input::Status => renderer.snapshot(&client.snapshot().await?)?,
        Input::Help => renderer.hint(HELP),
        Input::Quit => return Ok(false),
        Input::Invalid(reason) => renderer.warning(&reason),
    }
    Ok(true)
}
