//! WebSocket transport over `tokio-tungstenite`.
//!
//! Each transport runs as its own tokio task. The task connects, then pumps
//! outbound frames from an unbounded channel and reports inbound frames and
//! lifecycle changes as [`TransportNotice`]s. Dropping or closing the
//! [`WsTransport`] ends the task.
//!
//! A handshake that does not finish within the connector's deadline is
//! reported as an error followed by a close, like any failed attempt.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use chatline_core::constants::DEFAULT_CONNECT_TIMEOUT_MS;
use chatline_core::error::{ChatError, ChatResult};

use crate::transport::{
    Connector, Transport, TransportEvent, TransportId, TransportNotice, TransportNotifier,
};

/// Commands from the session to a socket task.
#[derive(Debug)]
enum Outbound {
    Frame(String),
    Close,
}

/// Opens [`WsTransport`]s that report to one notifier.
pub struct WsConnector {
    notifier: TransportNotifier,
    handshake_timeout: Duration,
}

impl WsConnector {
    pub fn new(notifier: TransportNotifier) -> Self {
        install_crypto_provider();
        Self {
            notifier,
            handshake_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
        }
    }

    /// Abandon any connection whose handshake takes longer than `timeout`.
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }
}

/// Install ring as the process-wide rustls provider for `wss://` URLs.
fn install_crypto_provider() {
    // Fails harmlessly when a provider is already installed.
    let _ = rustls::crypto::ring::default_provider().install_default();
}

impl Connector for WsConnector {
    fn open(&mut self, url: &str, id: TransportId) -> ChatResult<Box<dyn Transport>> {
        let request = url
            .into_client_request()
            .map_err(|e| ChatError::InvalidUrl(format!("{url}: {e}")))?;
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_socket(
            request,
            id,
            self.handshake_timeout,
            outbound_rx,
            self.notifier.clone(),
        ));
        Ok(Box::new(WsTransport {
            id,
            outbound: outbound_tx,
            task: Some(task),
        }))
    }
}

/// Handle to one WebSocket connection.
pub struct WsTransport {
    id: TransportId,
    outbound: mpsc::UnboundedSender<Outbound>,
    task: Option<JoinHandle<()>>,
}

impl Transport for WsTransport {
    fn send(&mut self, payload: &str) -> ChatResult<()> {
        self.outbound
            .send(Outbound::Frame(payload.to_string()))
            .map_err(|_| ChatError::Transport(format!("{} is no longer running", self.id)))
    }

    fn close(&mut self) {
        // The task may already have exited on its own.
        let _ = self.outbound.send(Outbound::Close);
        // Detach: the task finishes the close handshake by itself.
        self.task.take();
    }
}

impl Drop for WsTransport {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

fn report(notifier: &TransportNotifier, id: TransportId, event: TransportEvent) {
    // The session may be gone during teardown.
    let _ = notifier.send(TransportNotice { id, event });
}

async fn run_socket(
    request: Request,
    id: TransportId,
    handshake_timeout: Duration,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    notifier: TransportNotifier,
) {
    // Nothing is sent before the open notice, so any command here means close.
    let connected = tokio::select! {
        result = tokio::time::timeout(handshake_timeout, connect_async(request)) => result,
        _ = outbound.recv() => {
            debug!("{id} closed while connecting");
            return;
        }
    };

    let stream = match connected {
        Ok(Ok((stream, _response))) => stream,
        Ok(Err(e)) => {
            warn!("{id} failed to connect: {e}");
            report(&notifier, id, TransportEvent::Error(e.to_string()));
            report(&notifier, id, TransportEvent::Closed);
            return;
        }
        Err(_) => {
            warn!("{id} handshake timed out after {handshake_timeout:?}");
            report(&notifier, id, TransportEvent::Error("handshake timed out".into()));
            report(&notifier, id, TransportEvent::Closed);
            return;
        }
    };

    info!("{id} open");
    report(&notifier, id, TransportEvent::Opened);
    let (mut write, mut read) = stream.split();

    loop {
        tokio::select! {
            command = outbound.recv() => match command {
                Some(Outbound::Frame(text)) => {
                    if let Err(e) = write.send(Message::Text(text.into())).await {
                        report(&notifier, id, TransportEvent::Error(e.to_string()));
                        break;
                    }
                }
                Some(Outbound::Close) | None => {
                    debug!("{id} closing on request");
                    let _ = write.close().await;
                    break;
                }
            },
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    report(&notifier, id, TransportEvent::Message(text.as_str().to_owned()));
                }
                Some(Ok(Message::Binary(bytes))) => {
                    let text = String::from_utf8_lossy(&bytes).into_owned();
                    report(&notifier, id, TransportEvent::Message(text));
                }
                Some(Ok(Message::Close(frame))) => {
                    debug!("{id} received close frame: {frame:?}");
                    // Flushes the queued close reply.
                    let _ = write.close().await;
                    break;
                }
                // Ping/pong are answered by tungstenite.
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("{id} read error: {e}");
                    report(&notifier, id, TransportEvent::Error(e.to_string()));
                    break;
                }
                None => break,
            },
        }
    }

    report(&notifier, id, TransportEvent::Closed);
}
