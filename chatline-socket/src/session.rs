//! Connection lifecycle state machine.
//!
//! A [`Session`] owns one transport at a time, watches it through the
//! [`LifecycleObserver`] callbacks and replaces it after any unintentional
//! loss, waiting [`BackoffPolicy::delay`] between attempts. Retries continue
//! until [`Session::shutdown`], which is terminal.
//!
//! All methods take `&mut self`: the owner delivers transport notices, timer
//! firings and user actions one at a time, so at most one live transport and
//! at most one pending reconnect timer exist by construction.
//!
//! ```text
//! Idle --connect--> Connecting --opened--> Open
//!                        |                   |
//!                        +--error/closed-----+--> Closed --timer--> Connecting
//! any --shutdown--> Closed (terminal)
//! ```

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use chatline_core::config::AppConfig;
use chatline_core::constants::{self, geo};

use crate::backoff::BackoffPolicy;
use crate::correlator::ResponseCorrelator;
use crate::events::{
    LifecycleState, LinkDescriptor, MessageContent, Origin, PresentationSink, StatusKind,
};
use crate::location::{LocationError, LocationProvider};
use crate::scheduler::{Scheduler, TimerId};
use crate::transport::{Connector, LifecycleObserver, Transport, TransportId};

/// Notice appended when a transport opens.
pub const NOTICE_CONNECTED: &str = "Connection established";
/// Notice appended when a transport reports an error.
pub const NOTICE_ERROR: &str = "Connection error with server";
/// Notice appended when a transport closes unexpectedly.
pub const NOTICE_CLOSED: &str = "Connection closed";
/// Notice appended when text could not be sent.
pub const NOTICE_TEXT_NOT_SENT: &str = "Message not sent: no connection";
/// Notice appended when a location could not be sent.
pub const NOTICE_GEO_NOT_SENT: &str = "Location not sent: no connection";
/// Notice appended when a location is shared while a previous probe is unanswered.
pub const NOTICE_GEO_PENDING: &str = "Location request already pending";
/// Notice appended when the platform has no geolocation.
pub const NOTICE_GEO_UNSUPPORTED: &str = "Geolocation is not supported";
/// Notice appended when geolocation failed.
pub const NOTICE_GEO_FAILED: &str = "Could not get location";

/// Static parameters of a session.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub url: String,
    pub backoff: BackoffPolicy,
    /// Deadline for each transport to finish opening.
    pub connect_timeout: Duration,
}

impl SessionSettings {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            backoff: BackoffPolicy::default(),
            connect_timeout: Duration::from_millis(constants::DEFAULT_CONNECT_TIMEOUT_MS),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            url: config.server.url.clone(),
            backoff: BackoffPolicy::from_config(&config.reconnect),
            connect_timeout: config.reconnect.connect_timeout(),
        }
    }
}

/// One logical duplex session with automatic recovery.
pub struct Session {
    settings: SessionSettings,
    connector: Box<dyn Connector>,
    scheduler: Box<dyn Scheduler>,
    sink: Arc<dyn PresentationSink>,
    /// Current transport and its generation.
    transport: Option<(TransportId, Box<dyn Transport>)>,
    state: LifecycleState,
    manually_closed: bool,
    reconnect_attempts: u32,
    pending_timer: Option<TimerId>,
    correlator: ResponseCorrelator,
    next_transport_id: u64,
    next_timer_id: u64,
}

impl Session {
    pub fn new(
        settings: SessionSettings,
        connector: Box<dyn Connector>,
        scheduler: Box<dyn Scheduler>,
        sink: Arc<dyn PresentationSink>,
    ) -> Self {
        Self {
            settings,
            connector,
            scheduler,
            sink,
            transport: None,
            state: LifecycleState::Idle,
            manually_closed: false,
            reconnect_attempts: 0,
            pending_timer: None,
            correlator: ResponseCorrelator::new(),
            next_transport_id: 0,
            next_timer_id: 0,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts
    }

    pub fn is_manually_closed(&self) -> bool {
        self.manually_closed
    }

    /// The reconnect timer currently scheduled, if any.
    pub fn pending_timer(&self) -> Option<TimerId> {
        self.pending_timer
    }

    /// Id of the live transport, if any.
    pub fn transport_id(&self) -> Option<TransportId> {
        self.transport.as_ref().map(|(id, _)| *id)
    }

    pub fn is_probe_pending(&self) -> bool {
        self.correlator.is_pending()
    }

    pub fn url(&self) -> &str {
        &self.settings.url
    }

    /// Start connecting unless already connecting, open, or shut down.
    pub fn connect(&mut self) {
        if self.manually_closed {
            debug!("connect ignored: session was shut down");
            return;
        }
        if matches!(self.state, LifecycleState::Connecting | LifecycleState::Open) {
            debug!("connect ignored: already {}", self.state);
            return;
        }
        self.cancel_pending_timer();

        self.next_transport_id += 1;
        let id = TransportId(self.next_transport_id);
        self.set_state(LifecycleState::Connecting);
        self.sink
            .on_status(StatusKind::Connecting, StatusKind::Connecting.default_text());
        info!("connecting to {} ({id})", self.settings.url);

        match self.connector.open(&self.settings.url, id) {
            Ok(transport) => {
                // Idle and Closed never hold a transport.
                self.transport = Some((id, transport));
            }
            Err(e) => {
                warn!("could not start {id}: {e}");
                self.transport = None;
                self.lose_connection(id, StatusKind::Error, NOTICE_ERROR);
            }
        }
    }

    /// Transmit one frame if the session is open.
    ///
    /// Returns whether the payload was handed to the transport. Nothing is
    /// queued: a payload offered while disconnected is dropped.
    pub fn send(&mut self, payload: &str) -> bool {
        if self.state != LifecycleState::Open {
            debug!("send refused: session is {}", self.state);
            return false;
        }
        let Some((id, transport)) = self.transport.as_mut() else {
            return false;
        };
        match transport.send(payload) {
            Ok(()) => {
                debug!("sent {} bytes on {id}", payload.len());
                true
            }
            Err(e) => {
                warn!("send on {id} failed: {e}");
                false
            }
        }
    }

    /// Send user-typed text.
    ///
    /// Blank input is ignored. Otherwise the text is rendered as a local
    /// message, followed by a "not sent" notice if it could not be sent.
    pub fn send_text(&mut self, input: &str) -> bool {
        let text = input.trim();
        if text.is_empty() {
            return false;
        }
        self.sink.on_message(MessageContent::text(text), Origin::Local);
        if self.send(text) {
            return true;
        }
        self.notice(NOTICE_TEXT_NOT_SENT);
        false
    }

    /// Share a position: render a map link and send a `geo:<lat>,<lon>`
    /// probe whose echoed reply is hidden.
    ///
    /// Refused while another probe is still waiting for its reply. A refused
    /// probe renders only the notice, not the link.
    pub fn send_geo_probe(&mut self, latitude: f64, longitude: f64) -> bool {
        if self.state == LifecycleState::Open && self.correlator.is_pending() {
            warn!("location probe refused: previous probe unanswered");
            self.notice(NOTICE_GEO_PENDING);
            return false;
        }
        self.sink.on_message(
            MessageContent::Link(LinkDescriptor::for_position(latitude, longitude)),
            Origin::Local,
        );
        if self.state != LifecycleState::Open {
            self.notice(NOTICE_GEO_NOT_SENT);
            return false;
        }
        if !self.correlator.before_send_probe() {
            return false;
        }
        let payload = format!("{}{latitude},{longitude}", geo::PROBE_PREFIX);
        if self.send(&payload) {
            return true;
        }
        self.correlator.reset();
        self.notice(NOTICE_GEO_NOT_SENT);
        false
    }

    /// Look up the current position and share it. Failures are reported
    /// once through the sink and not retried.
    pub fn share_location(&mut self, provider: &dyn LocationProvider) -> bool {
        match provider.current_position() {
            Ok(position) => self.send_geo_probe(position.latitude, position.longitude),
            Err(LocationError::Unsupported) => {
                self.notice(NOTICE_GEO_UNSUPPORTED);
                false
            }
            Err(LocationError::Unavailable(reason)) => {
                warn!("location unavailable: {reason}");
                self.notice(NOTICE_GEO_FAILED);
                false
            }
        }
    }

    /// Close for good: cancel any pending reconnect and close the transport.
    pub fn shutdown(&mut self) {
        if self.manually_closed {
            return;
        }
        self.manually_closed = true;
        self.cancel_pending_timer();
        if let Some((id, mut transport)) = self.transport.take() {
            debug!("closing {id}");
            transport.close();
        }
        self.correlator.reset();
        self.set_state(LifecycleState::Closed);
        info!("session shut down");
    }

    /// A reconnect timer fired.
    pub fn on_reconnect_timer(&mut self, timer: TimerId) {
        if self.pending_timer != Some(timer) {
            debug!("ignoring stale timer {}", timer.0);
            return;
        }
        self.pending_timer = None;
        if self.manually_closed {
            return;
        }
        self.connect();
    }

    fn is_current(&self, id: TransportId) -> bool {
        self.transport_id() == Some(id)
    }

    fn set_state(&mut self, state: LifecycleState) {
        if self.state != state {
            info!("session state: {} -> {}", self.state, state);
            self.state = state;
        }
    }

    fn notice(&self, text: &str) {
        self.sink.on_message(MessageContent::text(text), Origin::Remote);
    }

    fn cancel_pending_timer(&mut self) {
        if let Some(timer) = self.pending_timer.take() {
            self.scheduler.cancel(timer);
        }
    }

    /// Drop the transport, report why, and schedule the next attempt.
    fn lose_connection(&mut self, id: TransportId, status: StatusKind, notice: &str) {
        if let Some((_, mut transport)) = self.transport.take() {
            transport.close();
        }
        // A probe reply can only arrive on the transport that carried the probe.
        self.correlator.reset();
        self.set_state(LifecycleState::Closed);
        self.sink.on_status(status, status.default_text());
        self.notice(notice);
        debug!("{id} lost");
        self.schedule_reconnect();
    }

    fn schedule_reconnect(&mut self) {
        if self.manually_closed {
            return;
        }
        self.cancel_pending_timer();

        let delay = self.settings.backoff.sample(self.reconnect_attempts);
        self.reconnect_attempts += 1;
        self.next_timer_id += 1;
        let timer = TimerId(self.next_timer_id);
        self.scheduler.schedule(timer, delay);
        self.pending_timer = Some(timer);

        warn!(
            "reconnection attempt {} in {:.1}s",
            self.reconnect_attempts,
            delay.as_secs_f64()
        );
        self.sink.on_status(
            StatusKind::Reconnecting,
            StatusKind::Reconnecting.default_text(),
        );
    }
}

impl LifecycleObserver for Session {
    fn on_open(&mut self, id: TransportId) {
        if !self.is_current(id) || self.state != LifecycleState::Connecting {
            debug!("ignoring open from {id}");
            return;
        }
        if self.reconnect_attempts > 0 {
            info!("reconnected after {} attempt(s)", self.reconnect_attempts);
        }
        self.reconnect_attempts = 0;
        self.set_state(LifecycleState::Open);
        self.sink
            .on_status(StatusKind::Online, StatusKind::Online.default_text());
        self.notice(NOTICE_CONNECTED);
    }

    fn on_message(&mut self, id: TransportId, frame: String) {
        if !self.is_current(id) || self.state != LifecycleState::Open {
            debug!("ignoring frame from {id}");
            return;
        }
        if let Some(frame) = self.correlator.on_inbound_frame(frame) {
            self.sink.on_message(MessageContent::Text(frame), Origin::Remote);
        }
    }

    fn on_error(&mut self, id: TransportId, error: String) {
        if self.manually_closed || !self.is_current(id) {
            return;
        }
        warn!("{id} error: {error}");
        self.lose_connection(id, StatusKind::Error, NOTICE_ERROR);
    }

    fn on_close(&mut self, id: TransportId) {
        if self.manually_closed || !self.is_current(id) {
            return;
        }
        info!("{id} closed by remote");
        self.lose_connection(id, StatusKind::Closed, NOTICE_CLOSED);
    }
}
