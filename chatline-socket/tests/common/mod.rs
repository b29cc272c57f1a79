//! Shared test doubles for session integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chatline_core::error::{ChatError, ChatResult};
use chatline_socket::{
    Connector, LifecycleObserver, MessageContent, Origin, PresentationSink, Scheduler, Session,
    SessionEvent, SessionSettings, StatusKind, TimerId, Transport, TransportEvent, TransportId,
    TransportNotice, TransportNotifier,
};
use tokio::sync::mpsc;

// ---- Synchronous doubles ----

/// Everything the mock transports saw.
#[derive(Default)]
pub struct Wire {
    pub opened: Vec<(String, TransportId)>,
    pub frames: Vec<(TransportId, String)>,
    pub closed: Vec<TransportId>,
    /// Number of upcoming `open` calls to fail.
    pub refuse_next: usize,
}

impl Wire {
    pub fn frame_texts(&self) -> Vec<String> {
        self.frames.iter().map(|(_, f)| f.clone()).collect()
    }
}

pub type SharedWire = Arc<Mutex<Wire>>;

pub struct MockTransport {
    id: TransportId,
    wire: SharedWire,
}

impl Transport for MockTransport {
    fn send(&mut self, payload: &str) -> ChatResult<()> {
        self.wire
            .lock()
            .unwrap()
            .frames
            .push((self.id, payload.to_string()));
        Ok(())
    }

    fn close(&mut self) {
        self.wire.lock().unwrap().closed.push(self.id);
    }
}

pub struct MockConnector {
    wire: SharedWire,
}

impl Connector for MockConnector {
    fn open(&mut self, url: &str, id: TransportId) -> ChatResult<Box<dyn Transport>> {
        let mut wire = self.wire.lock().unwrap();
        if wire.refuse_next > 0 {
            wire.refuse_next -= 1;
            return Err(ChatError::Transport("connection refused".into()));
        }
        wire.opened.push((url.to_string(), id));
        Ok(Box::new(MockTransport {
            id,
            wire: self.wire.clone(),
        }))
    }
}

/// Timer bookkeeping: what was scheduled, cancelled and fired.
#[derive(Default)]
pub struct Timers {
    pub scheduled: Vec<(TimerId, Duration)>,
    pub cancelled: Vec<TimerId>,
    pub fired: Vec<TimerId>,
}

impl Timers {
    /// Timers that were scheduled and have neither fired nor been cancelled.
    pub fn live(&self) -> Vec<TimerId> {
        self.scheduled
            .iter()
            .map(|(id, _)| *id)
            .filter(|id| !self.cancelled.contains(id) && !self.fired.contains(id))
            .collect()
    }

    pub fn delays(&self) -> Vec<Duration> {
        self.scheduled.iter().map(|(_, d)| *d).collect()
    }
}

pub type SharedTimers = Arc<Mutex<Timers>>;

pub struct MockScheduler {
    timers: SharedTimers,
}

impl Scheduler for MockScheduler {
    fn schedule(&mut self, id: TimerId, delay: Duration) {
        self.timers.lock().unwrap().scheduled.push((id, delay));
    }

    fn cancel(&mut self, id: TimerId) {
        self.timers.lock().unwrap().cancelled.push(id);
    }
}

/// Sink that records every event in order.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SessionEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<SessionEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn statuses(&self) -> Vec<StatusKind> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SessionEvent::Status { status, .. } => Some(status),
                _ => None,
            })
            .collect()
    }

    pub fn messages(&self) -> Vec<(MessageContent, Origin)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SessionEvent::Message { content, origin } => Some((content, origin)),
                _ => None,
            })
            .collect()
    }

    /// Messages as (display text, origin) pairs.
    pub fn message_texts(&self) -> Vec<(String, Origin)> {
        self.messages()
            .into_iter()
            .map(|(c, o)| (c.display_text().to_string(), o))
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl PresentationSink for RecordingSink {
    fn on_status(&self, status: StatusKind, text: &str) {
        self.events.lock().unwrap().push(SessionEvent::Status {
            status,
            text: text.to_string(),
        });
    }

    fn on_message(&self, content: MessageContent, origin: Origin) {
        self.events
            .lock()
            .unwrap()
            .push(SessionEvent::Message { content, origin });
    }
}

/// A session wired to mocks, driven by hand.
pub struct Harness {
    pub session: Session,
    pub wire: SharedWire,
    pub timers: SharedTimers,
    pub sink: Arc<RecordingSink>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(SessionSettings::new("ws://chat.test/socket"))
    }

    pub fn with_settings(settings: SessionSettings) -> Self {
        let wire = SharedWire::default();
        let timers = SharedTimers::default();
        let sink = Arc::new(RecordingSink::default());
        let session = Session::new(
            settings,
            Box::new(MockConnector { wire: wire.clone() }),
            Box::new(MockScheduler {
                timers: timers.clone(),
            }),
            sink.clone(),
        );
        Self {
            session,
            wire,
            timers,
            sink,
        }
    }

    /// Connect and report the new transport as open.
    pub fn connect_and_open(&mut self) -> TransportId {
        self.session.connect();
        self.open_current()
    }

    pub fn open_current(&mut self) -> TransportId {
        let id = self
            .session
            .transport_id()
            .expect("session should hold a transport");
        self.session.on_open(id);
        id
    }

    /// Fire the pending reconnect timer, as the runtime would.
    pub fn fire_pending_timer(&mut self) -> TimerId {
        let timer = self
            .session
            .pending_timer()
            .expect("a reconnect timer should be pending");
        self.timers.lock().unwrap().fired.push(timer);
        self.session.on_reconnect_timer(timer);
        timer
    }

    pub fn live_timers(&self) -> Vec<TimerId> {
        self.timers.lock().unwrap().live()
    }

    pub fn open_count(&self) -> usize {
        self.wire.lock().unwrap().opened.len()
    }

    pub fn frames(&self) -> Vec<String> {
        self.wire.lock().unwrap().frame_texts()
    }
}

// ---- Async doubles ----

/// A transport opened through [`ScriptedConnector`], controllable from the test.
pub struct OpenedTransport {
    pub id: TransportId,
    pub url: String,
    pub frames: Arc<Mutex<Vec<String>>>,
    notifier: TransportNotifier,
}

impl OpenedTransport {
    fn push(&self, event: TransportEvent) {
        self.notifier
            .send(TransportNotice { id: self.id, event })
            .expect("driver should be running");
    }

    pub fn accept(&self) {
        self.push(TransportEvent::Opened);
    }

    pub fn deliver(&self, frame: &str) {
        self.push(TransportEvent::Message(frame.to_string()));
    }

    pub fn drop_connection(&self) {
        self.push(TransportEvent::Closed);
    }

    pub fn fail(&self, reason: &str) {
        self.push(TransportEvent::Error(reason.to_string()));
    }

    pub fn sent(&self) -> Vec<String> {
        self.frames.lock().unwrap().clone()
    }
}

struct ScriptedTransport {
    frames: Arc<Mutex<Vec<String>>>,
}

impl Transport for ScriptedTransport {
    fn send(&mut self, payload: &str) -> ChatResult<()> {
        self.frames.lock().unwrap().push(payload.to_string());
        Ok(())
    }

    fn close(&mut self) {}
}

/// Connector that hands every opened transport to the test.
pub struct ScriptedConnector {
    notifier: TransportNotifier,
    opened: mpsc::UnboundedSender<OpenedTransport>,
}

impl ScriptedConnector {
    pub fn factory(
        opened: mpsc::UnboundedSender<OpenedTransport>,
    ) -> impl FnOnce(TransportNotifier) -> ScriptedConnector {
        move |notifier| ScriptedConnector { notifier, opened }
    }
}

impl Connector for ScriptedConnector {
    fn open(&mut self, url: &str, id: TransportId) -> ChatResult<Box<dyn Transport>> {
        let frames = Arc::new(Mutex::new(Vec::new()));
        let _ = self.opened.send(OpenedTransport {
            id,
            url: url.to_string(),
            frames: frames.clone(),
            notifier: self.notifier.clone(),
        });
        Ok(Box::new(ScriptedTransport { frames }))
    }
}

/// Route a notice through the observer interface, for tests that bypass the driver.
pub fn notify(session: &mut Session, id: TransportId, event: TransportEvent) {
    session.notify(TransportNotice { id, event });
}
