//! Transport abstraction.
//!
//! A transport is a URL-identified duplex channel of ordered text frames with
//! at-most-once delivery. It is driven through [`Transport`] and reports its
//! lifecycle asynchronously as [`TransportNotice`]s, which the owner feeds to
//! a [`LifecycleObserver`]. Each transport gets a fresh [`TransportId`] so
//! notices from a replaced transport can be recognised and dropped.

use tokio::sync::mpsc;

use chatline_core::error::ChatResult;

/// Generation number of a transport within one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransportId(pub u64);

impl std::fmt::Display for TransportId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "transport#{}", self.0)
    }
}

/// Lifecycle notification from a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Opened,
    Message(String),
    /// Opaque failure description. Always treated as connection loss.
    Error(String),
    Closed,
}

/// A notification tagged with the transport that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportNotice {
    pub id: TransportId,
    pub event: TransportEvent,
}

/// Channel on which transports deliver their notices.
pub type TransportNotifier = mpsc::UnboundedSender<TransportNotice>;

/// An established (or establishing) duplex channel.
pub trait Transport: Send {
    /// Queue one text frame. Does not wait for it to reach the wire.
    fn send(&mut self, payload: &str) -> ChatResult<()>;

    /// Begin closing. Safe to call more than once.
    fn close(&mut self);
}

/// Factory for transports.
pub trait Connector: Send {
    /// Start connecting to `url`. Returns immediately; the outcome arrives as
    /// notices tagged with `id`.
    fn open(&mut self, url: &str, id: TransportId) -> ChatResult<Box<dyn Transport>>;
}

/// Receiver of transport lifecycle callbacks.
pub trait LifecycleObserver {
    fn on_open(&mut self, id: TransportId);

    fn on_message(&mut self, id: TransportId, frame: String);

    fn on_error(&mut self, id: TransportId, error: String);

    fn on_close(&mut self, id: TransportId);

    /// Route a notice to the matching callback.
    fn notify(&mut self, notice: TransportNotice) {
        let TransportNotice { id, event } = notice;
        match event {
            TransportEvent::Opened => self.on_open(id),
            TransportEvent::Message(frame) => self.on_message(id, frame),
            TransportEvent::Error(error) => self.on_error(id, error),
            TransportEvent::Closed => self.on_close(id),
        }
    }
}
