//! In-memory conversation log.
//!
//! Append-only: records are never edited or removed and have no identity
//! beyond their position. Nothing is persisted.

use std::sync::{Mutex, MutexGuard};

use serde::Serialize;

use crate::events::{MessageContent, Origin, PresentationSink, StatusKind};

/// One rendered message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageRecord {
    pub content: MessageContent,
    pub origin: Origin,
}

#[derive(Debug, Default)]
struct LogInner {
    records: Vec<MessageRecord>,
    status: Option<(StatusKind, String)>,
}

/// Sink that keeps the conversation and the latest status.
#[derive(Debug, Default)]
pub struct ConversationLog {
    inner: Mutex<LogInner>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, LogInner> {
        // Every write is a single push or assignment, so poisoning is harmless.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Snapshot of all records, oldest first.
    pub fn records(&self) -> Vec<MessageRecord> {
        self.lock().records.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().records.is_empty()
    }

    /// The most recent status, if any was reported.
    pub fn status(&self) -> Option<(StatusKind, String)> {
        self.lock().status.clone()
    }
}

impl PresentationSink for ConversationLog {
    fn on_status(&self, status: StatusKind, text: &str) {
        self.lock().status = Some((status, text.to_string()));
    }

    fn on_message(&self, content: MessageContent, origin: Origin) {
        self.lock().records.push(MessageRecord { content, origin });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::LinkDescriptor;

    #[test]
    fn test_log_starts_empty() {
        let log = ConversationLog::new();
        assert!(log.is_empty());
        assert!(log.status().is_none());
    }

    #[test]
    fn test_log_preserves_order() {
        let log = ConversationLog::new();
        log.on_message(MessageContent::text("first"), Origin::Local);
        log.on_message(
            MessageContent::Link(LinkDescriptor::for_position(1.0, 2.0)),
            Origin::Local,
        );
        log.on_message(MessageContent::text("third"), Origin::Remote);

        let records = log.records();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].content.display_text(), "first");
        assert!(matches!(records[1].content, MessageContent::Link(_)));
        assert_eq!(records[2].origin, Origin::Remote);
    }

    #[test]
    fn test_log_tracks_latest_status() {
        let log = ConversationLog::new();
        log.on_status(StatusKind::Connecting, "Connecting...");
        log.on_status(StatusKind::Online, "Online");
        assert_eq!(log.status(), Some((StatusKind::Online, "Online".to_string())));
        assert!(log.is_empty());
    }
}
