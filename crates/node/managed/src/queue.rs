//! The outbound event queue.

use kona_interop::ManagedEvent;
use tokio::sync::{Mutex, broadcast};
use tracing::warn;

/// A bounded single-consumer queue of [`ManagedEvent`]s.
///
/// Pushing never blocks: once the queue is full the oldest unread event is dropped. The
/// subscription and `pull_event` drain the same receiver, so every event is delivered at most
/// once.
#[derive(Debug)]
pub struct EventQueue {
    tx: broadcast::Sender<ManagedEvent>,
    rx: Mutex<broadcast::Receiver<ManagedEvent>>,
}

impl EventQueue {
    /// Creates a queue holding at most `capacity` unread events.
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = broadcast::channel(capacity.max(1));
        Self { tx, rx: Mutex::new(rx) }
    }

    /// Enqueues `event`.
    pub fn push(&self, event: ManagedEvent) {
        // The queue owns a receiver, so sending cannot fail.
        let _ = self.tx.send(event);
    }

    /// Returns the number of unread events.
    pub fn len(&self) -> usize {
        self.tx.len()
    }

    /// Returns true if there are no unread events.
    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }

    /// Pops the oldest unread event without waiting.
    ///
    /// Returns `None` when the queue is empty or a subscription is currently draining it.
    pub fn pop(&self) -> Option<ManagedEvent> {
        let mut rx = self.rx.try_lock().ok()?;
        loop {
            match rx.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!(target: "managed_mode", skipped, "Event queue overflowed, dropped oldest events");
                }
                Err(_) => return None,
            }
        }
    }

    /// Waits for the next event.
    pub async fn next(&self) -> Option<ManagedEvent> {
        let mut rx = self.rx.lock().await;
        loop {
            match rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(target: "managed_mode", skipped, "Event queue overflowed, dropped oldest events");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
