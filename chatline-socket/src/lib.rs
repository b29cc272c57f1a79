//! Chatline Socket - connection lifecycle management for the chat widget.
//!
//! This crate owns everything between the user's input and the wire:
//! - A `Session` state machine that connects, detects loss and reconnects
//!   with capped exponential backoff until it is shut down
//! - A response correlator that hides the echoed reply to a location probe
//! - Presentation events fanned out to sinks (broadcast dispatcher,
//!   in-memory conversation log)
//! - A `tokio-tungstenite` WebSocket transport and a tokio driver that
//!   serialises transport callbacks, timer firings and user commands

pub mod backoff;
pub mod conversation;
pub mod correlator;
pub mod driver;
pub mod events;
pub mod location;
pub mod scheduler;
pub mod session;
pub mod transport;
pub mod ws;

// Re-export key types
pub use backoff::BackoffPolicy;
pub use conversation::{ConversationLog, MessageRecord};
pub use correlator::ResponseCorrelator;
pub use driver::{ChatClient, SessionDriver, SessionSnapshot};
pub use events::{
    EventDispatcher, FanoutSink, LifecycleState, LinkDescriptor, MessageContent, Origin,
    PresentationSink, SessionEvent, StatusKind,
};
pub use location::{FixedLocation, LocationError, LocationProvider, NoLocation, Position};
pub use scheduler::{Scheduler, TimerId, TokioScheduler};
pub use session::{Session, SessionSettings};
pub use transport::{
    Connector, LifecycleObserver, Transport, TransportEvent, TransportId, TransportNotice,
    TransportNotifier,
};
pub use ws::{WsConnector, WsTransport};
