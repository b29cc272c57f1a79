//! One-shot reconnect timers.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Identifier of a scheduled timer. Never reused within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(pub u64);

/// Schedules timers whose firing is reported back to the session owner.
pub trait Scheduler: Send {
    /// Arrange for `id` to fire once after `delay`.
    fn schedule(&mut self, id: TimerId, delay: Duration);

    /// Cancel `id`. A no-op if it already fired or was never scheduled.
    fn cancel(&mut self, id: TimerId);
}

/// Scheduler backed by `tokio::time::sleep` tasks.
///
/// Holds at most one live timer: scheduling a new one aborts the previous
/// task. Firings are sent on the channel given at construction.
pub struct TokioScheduler {
    fired: mpsc::UnboundedSender<TimerId>,
    current: Option<(TimerId, JoinHandle<()>)>,
}

impl TokioScheduler {
    pub fn new(fired: mpsc::UnboundedSender<TimerId>) -> Self {
        Self {
            fired,
            current: None,
        }
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&mut self, id: TimerId, delay: Duration) {
        if let Some((previous, handle)) = self.current.take() {
            debug!("replacing timer {} with {}", previous.0, id.0);
            handle.abort();
        }
        let fired = self.fired.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = fired.send(id);
        });
        self.current = Some((id, handle));
    }

    fn cancel(&mut self, id: TimerId) {
        match self.current.take() {
            Some((current, handle)) if current == id => handle.abort(),
            other => self.current = other,
        }
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        if let Some((_, handle)) = self.current.take() {
            handle.abort();
        }
    }
}
