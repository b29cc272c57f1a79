//! Terminal rendering of session events.

use chrono::{DateTime, Local};
use console::{style, StyledObject};

use chatline_core::error::ChatResult;
use chatline_socket::{
    MessageContent, MessageRecord, Origin, SessionEvent, SessionSnapshot, StatusKind,
};

use crate::OutputFormat;

/// Writes session output to stdout in the selected format.
pub struct Renderer {
    format: OutputFormat,
}

impl Renderer {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    pub fn event(&self, event: &SessionEvent) -> ChatResult<()> {
        println!("{}", self.event_line(event, Local::now())?);
        Ok(())
    }

    /// Render one event. Json output is the bare event, one per line.
    pub fn event_line(&self, event: &SessionEvent, at: DateTime<Local>) -> ChatResult<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string(event)?),
            OutputFormat::Text => Ok(text_line(event, &at.format("%H:%M:%S").to_string())),
        }
    }

    pub fn history(&self, records: &[MessageRecord]) -> ChatResult<()> {
        match self.format {
            OutputFormat::Json => {
                for record in records {
                    println!("{}", serde_json::to_string(record)?);
                }
            }
            OutputFormat::Text => {
                if records.is_empty() {
                    println!("  {}", style("(no messages yet)").dim());
                }
                for record in records {
                    println!(
                        "  {}: {}",
                        origin_label(record.origin),
                        content_text(&record.content)
                    );
                }
            }
        }
        Ok(())
    }

    pub fn snapshot(&self, snapshot: &SessionSnapshot) -> ChatResult<()> {
        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string(snapshot)?),
            OutputFormat::Text => {
                println!("{}", style("Session").bold().underlined());
                println!("  url                 {}", snapshot.url);
                println!("  state               {}", snapshot.state);
                println!("  reconnect attempts  {}", snapshot.reconnect_attempts);
                println!("  reconnect pending   {}", snapshot.reconnect_pending);
                println!("  location pending    {}", snapshot.probe_pending);
            }
        }
        Ok(())
    }

    /// Print a CLI-side hint. Suppressed in json mode.
    pub fn hint(&self, text: &str) {
        if !self.is_json() {
            println!("  {}", style(text).dim());
        }
    }

    pub fn warning(&self, text: &str) {
        if !self.is_json() {
            println!("  {} {text}", style("WARN").yellow());
        }
    }
}

/// Plain-text rendering of an event, prefixed with `timestamp`.
pub fn text_line(event: &SessionEvent, timestamp: &str) -> String {
    let stamp = style(format!("[{timestamp}]")).dim();
    match event {
        SessionEvent::Status { status, text } => {
            format!("{stamp} {} {}", style("*").bold(), status_style(*status, text))
        }
        SessionEvent::Message { content, origin } => {
            format!("{stamp} {}: {}", origin_label(*origin), content_text(content))
        }
    }
}

fn status_style(status: StatusKind, text: &str) -> StyledObject<&str> {
    let styled = style(text);
    match status {
        StatusKind::Online => styled.green(),
        StatusKind::Connecting | StatusKind::Reconnecting => styled.yellow(),
        StatusKind::Error => styled.red(),
        StatusKind::Closed => styled.dim(),
    }
}

fn origin_label(origin: Origin) -> StyledObject<&'static str> {
    match origin {
        Origin::Local => style("you").cyan().bold(),
        Origin::Remote => style("server").magenta().bold(),
    }
}

fn content_text(content: &MessageContent) -> String {
    match content {
        MessageContent::Text(text) => text.clone(),
        MessageContent::Link(link) => {
            format!("{} <{}>", style(&link.label).underlined(), link.href)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatline_socket::LinkDescriptor;

    fn plain() {
        console::set_colors_enabled(false);
    }

    #[test]
    fn test_status_line() {
        plain();
        let event = SessionEvent::Status {
            status: StatusKind::Reconnecting,
            text: "Reconnecting...".into(),
        };
        assert_eq!(text_line(&event, "12:00:00"), "[12:00:00] * Reconnecting...");
    }

    #[test]
    fn test_message_lines() {
        plain();
        let local = SessionEvent::Message {
            content: MessageContent::text("hi"),
            origin: Origin::Local,
        };
        assert_eq!(text_line(&local, "09:15:02"), "[09:15:02] you: hi");

        let link = SessionEvent::Message {
            content: MessageContent::Link(LinkDescriptor::for_position(10.0, 20.0)),
            origin: Origin::Local,
        };
        assert_eq!(
            text_line(&link, "09:15:03"),
            "[09:15:03] you: OpenStreetMap (10.00000, 20.00000) \
             <https://www.openstreetmap.org/#map=18/10/20>"
        );
    }

    #[test]
    fn test_json_line_is_bare_event() {
        let renderer = Renderer::new(OutputFormat::Json);
        let event = SessionEvent::Message {
            content: MessageContent::text("hello"),
            origin: Origin::Remote,
        };
        let line = renderer.event_line(&event, Local::now()).unwrap();
        let parsed: SessionEvent = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed, event);
        assert!(!line.contains('\n'));
    }
}
