//! Suppression of the echoed reply to a location probe.
//!
//! Probe replies share the inbound channel with ordinary traffic and carry no
//! identifier, so the only handle on them is ordering: the first frame after a
//! probe is taken to be its answer. Only one probe may be in flight.

use tracing::debug;

/// Single-slot marker for an outstanding probe.
#[derive(Debug, Default)]
pub struct ResponseCorrelator {
    pending: bool,
}

impl ResponseCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a probe as about to be sent.
    ///
    /// Returns false, leaving the existing marker alone, when a probe is
    /// already awaiting its reply.
    pub fn before_send_probe(&mut self) -> bool {
        if self.pending {
            return false;
        }
        self.pending = true;
        true
    }

    /// Route an inbound frame. Returns `None` when it was swallowed as a
    /// probe reply.
    pub fn on_inbound_frame(&mut self, frame: String) -> Option<String> {
        if self.pending {
            self.pending = false;
            debug!("swallowed probe reply ({} bytes)", frame.len());
            return None;
        }
        Some(frame)
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Drop the marker. Used when the probe never reached the wire or the
    /// transport that would carry its reply is gone.
    pub fn reset(&mut self) {
        self.pending = false;
    }
}
