//! Tokio driver for a [`Session`].
//!
//! The session is a synchronous state machine; this module gives it a home.
//! One task owns the session and is the only place it is touched. Transport
//! notices, timer firings and user commands are funnelled into that task
//! over channels, so callbacks run one at a time and never race.
//!
//! [`ChatClient`] is the cloneable handle the UI talks to.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use chatline_core::error::{ChatError, ChatResult};

use crate::events::{LifecycleState, PresentationSink};
use crate::location::LocationProvider;
use crate::scheduler::{TimerId, TokioScheduler};
use crate::session::{Session, SessionSettings};
use crate::transport::{Connector, LifecycleObserver, TransportNotice, TransportNotifier};
use crate::ws::WsConnector;

/// Capacity of the user command channel.
const COMMAND_CHANNEL_CAPACITY: usize = 64;

/// Point-in-time view of the session, for status displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub url: String,
    pub state: LifecycleState,
    pub reconnect_attempts: u32,
    pub reconnect_pending: bool,
    pub manually_closed: bool,
    pub probe_pending: bool,
}

impl SessionSnapshot {
    fn of(session: &Session) -> Self {
        Self {
            url: session.url().to_string(),
            state: session.state(),
            reconnect_attempts: session.reconnect_attempts(),
            reconnect_pending: session.pending_timer().is_some(),
            manually_closed: session.is_manually_closed(),
            probe_pending: session.is_probe_pending(),
        }
    }
}

/// User actions forwarded to the session task.
enum Command {
    SendText {
        text: String,
        reply: oneshot::Sender<bool>,
    },
    SendGeoProbe {
        latitude: f64,
        longitude: f64,
        reply: oneshot::Sender<bool>,
    },
    ShareLocation {
        reply: oneshot::Sender<bool>,
    },
    Snapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
    Shutdown {
        reply: oneshot::Sender<SessionSnapshot>,
    },
}

/// Owns a session and runs its event loop.
pub struct SessionDriver {
    session: Session,
    location: Box<dyn LocationProvider>,
    commands: mpsc::Receiver<Command>,
    notices: mpsc::UnboundedReceiver<TransportNotice>,
    timers: mpsc::UnboundedReceiver<TimerId>,
}

impl SessionDriver {
    /// Spawn a session that talks WebSocket.
    pub fn spawn(
        settings: SessionSettings,
        sink: Arc<dyn PresentationSink>,
        location: Box<dyn LocationProvider>,
    ) -> (ChatClient, JoinHandle<()>) {
        let handshake_timeout = settings.connect_timeout;
        Self::spawn_with(settings, sink, location, move |notifier| {
            WsConnector::new(notifier).with_handshake_timeout(handshake_timeout)
        })
    }

    /// Spawn a session whose transports come from `make_connector`.
    ///
    /// The factory receives the notifier its transports must report to.
    pub fn spawn_with<C, F>(
        settings: SessionSettings,
        sink: Arc<dyn PresentationSink>,
        location: Box<dyn LocationProvider>,
        make_connector: F,
    ) -> (ChatClient, JoinHandle<()>)
    where
        C: Connector + 'static,
        F: FnOnce(TransportNotifier) -> C,
    {
        let (notice_tx, notices) = mpsc::unbounded_channel();
        let (timer_tx, timers) = mpsc::unbounded_channel();
        let (command_tx, commands) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);

        let session = Session::new(
            settings,
            Box::new(make_connector(notice_tx)),
            Box::new(TokioScheduler::new(timer_tx)),
            sink,
        );
        let driver = SessionDriver {
            session,
            location,
            commands,
            notices,
            timers,
        };
        let handle = tokio::spawn(driver.run());
        (ChatClient { commands: command_tx }, handle)
    }

    /// Connect and process events until shut down or every client is dropped.
    pub async fn run(mut self) {
        self.session.connect();

        loop {
            tokio::select! {
                Some(notice) = self.notices.recv() => {
                    self.session.notify(notice);
                }
                Some(timer) = self.timers.recv() => {
                    self.session.on_reconnect_timer(timer);
                }
                command = self.commands.recv() => {
                    let Some(command) = command else {
                        debug!("all clients dropped");
                        self.session.shutdown();
                        break;
                    };
                    if !self.handle(command) {
                        break;
                    }
                }
            }
        }

        info!("session driver stopped");
    }

    /// Apply one command. Returns false once the session is shut down.
    fn handle(&mut self, command: Command) -> bool {
        // A dropped reply receiver just means the caller stopped waiting.
        match command {
            Command::SendText { text, reply } => {
                let _ = reply.send(self.session.send_text(&text));
            }
            Command::SendGeoProbe {
                latitude,
                longitude,
                reply,
            } => {
                let _ = reply.send(self.session.send_geo_probe(latitude, longitude));
            }
            Command::ShareLocation { reply } => {
                let _ = reply.send(self.session.share_location(self.location.as_ref()));
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(SessionSnapshot::of(&self.session));
            }
            Command::Shutdown { reply } => {
                self.session.shutdown();
                let _ = reply.send(SessionSnapshot::of(&self.session));
                return false;
            }
        }
        true
    }
}

/// Handle for issuing commands to a running session.
#[derive(Clone)]
pub struct ChatClient {
    commands: mpsc::Sender<Command>,
}

impl ChatClient {
    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> Command) -> ChatResult<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(build(reply))
            .await
            .map_err(|_| ChatError::Internal("session task has stopped".into()))?;
        response
            .await
            .map_err(|_| ChatError::Internal("session task dropped the request".into()))
    }

    /// Send typed text. Resolves to whether it reached the transport.
    pub async fn send_text(&self, text: impl Into<String>) -> ChatResult<bool> {
        let text = text.into();
        self.request(|reply| Command::SendText { text, reply }).await
    }

    /// Share explicit coordinates as a probe.
    pub async fn send_geo_probe(&self, latitude: f64, longitude: f64) -> ChatResult<bool> {
        self.request(|reply| Command::SendGeoProbe {
            latitude,
            longitude,
            reply,
        })
        .await
    }

    /// Share the position reported by the session's location provider.
    pub async fn share_location(&self) -> ChatResult<bool> {
        self.request(|reply| Command::ShareLocation { reply }).await
    }

    pub async fn snapshot(&self) -> ChatResult<SessionSnapshot> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    /// Shut the session down for good and stop its task.
    pub async fn shutdown(&self) -> ChatResult<SessionSnapshot> {
        self.request(|reply| Command::Shutdown { reply }).await
    }
}
