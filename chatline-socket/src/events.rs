//! Presentation events and sinks.
//!
//! The session reports everything the user should see through a
//! [`PresentationSink`]: status changes and conversation messages. Sinks are
//! called synchronously from inside the session and must not block.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use chatline_core::constants::geo;

/// Lifecycle state of a session relative to its transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    /// No connection has been requested yet.
    Idle,
    /// A transport has been created and is establishing the connection.
    Connecting,
    /// The transport is open and frames can be sent.
    Open,
    /// The transport is gone. Terminal once the session is shut down.
    Closed,
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Connecting => write!(f, "connecting"),
            Self::Open => write!(f, "open"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Status category shown next to the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    Connecting,
    Reconnecting,
    Online,
    Error,
    Closed,
}

impl StatusKind {
    /// Default human-readable text for this status.
    pub fn default_text(&self) -> &'static str {
        match self {
            Self::Connecting => "Connecting...",
            Self::Reconnecting => "Reconnecting...",
            Self::Online => "Online",
            Self::Error => "Connection error",
            Self::Closed => "Connection closed",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Reconnecting => "reconnecting",
            Self::Online => "online",
            Self::Error => "error",
            Self::Closed => "closed",
        }
    }
}

impl std::fmt::Display for StatusKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who produced a message: the local user or the remote side.
///
/// Connection notices ("Connection established", "not sent" warnings) are
/// rendered as remote messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Local,
    Remote,
}

/// A hyperlink rendered in place of plain text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkDescriptor {
    pub href: String,
    pub label: String,
}

impl LinkDescriptor {
    /// Map link for a shared position.
    pub fn for_position(latitude: f64, longitude: f64) -> Self {
        let precision = geo::LABEL_PRECISION;
        Self {
            href: format!(
                "{}#map={}/{latitude}/{longitude}",
                geo::MAP_BASE_URL,
                geo::MAP_ZOOM
            ),
            label: format!("OpenStreetMap ({latitude:.precision$}, {longitude:.precision$})"),
        }
    }
}

/// Content of a conversation message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum MessageContent {
    Text(String),
    Link(LinkDescriptor),
}

impl MessageContent {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// The text shown for this content (link label for links).
    pub fn display_text(&self) -> &str {
        match self {
            Self::Text(t) => t,
            Self::Link(link) => &link.label,
        }
    }
}

/// Receiver of everything the session wants rendered.
pub trait PresentationSink: Send + Sync {
    /// A status change, with the text to show for it.
    fn on_status(&self, status: StatusKind, text: &str);

    /// A message to append to the conversation.
    fn on_message(&self, content: MessageContent, origin: Origin);
}

/// A single presentation event, for sinks that forward rather than render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum SessionEvent {
    Status { status: StatusKind, text: String },
    Message { content: MessageContent, origin: Origin },
}

/// Broadcast-based sink for decoupled rendering.
///
/// Uses tokio::broadcast channels so multiple consumers can independently
/// receive events without blocking the session.
#[derive(Clone)]
pub struct EventDispatcher {
    sender: broadcast::Sender<SessionEvent>,
}

impl EventDispatcher {
    /// Create a new EventDispatcher with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to session events.
    ///
    /// Slow consumers that fall behind will receive a RecvError::Lagged and
    /// miss events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    /// Dispatch an event to all active subscribers.
    pub fn dispatch(&self, event: SessionEvent) {
        match self.sender.send(event) {
            Ok(count) => debug!("dispatched session event to {count} subscriber(s)"),
            // No active receivers -- this is fine during startup/shutdown
            Err(_) => debug!("no subscribers for session event"),
        }
    }

    /// Get the current number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl PresentationSink for EventDispatcher {
    fn on_status(&self, status: StatusKind, text: &str) {
        self.dispatch(SessionEvent::Status {
            status,
            text: text.to_string(),
        });
    }

    fn on_message(&self, content: MessageContent, origin: Origin) {
        self.dispatch(SessionEvent::Message { content, origin });
    }
}

/// Forwards every call to each inner sink, in order.
#[derive(Clone, Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn PresentationSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn PresentationSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl PresentationSink for FanoutSink {
    fn on_status(&self, status: StatusKind, text: &str) {
        for sink in &self.sinks {
            sink.on_status(status, text);
        }
    }

    fn on_message(&self, content: MessageContent, origin: Origin) {
        for sink in &self.sinks {
            sink.on_message(content.clone(), origin);
        }
    }
}
