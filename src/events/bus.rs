//! # Broadcast channel for pool notifications.
//!
//! [`Bus`] wraps [`tokio::sync::broadcast`]. The supervisor actor is the main
//! publisher; subscriber workers publish their own health events.
//!
//! ```text
//! Publishers:                      Receivers:
//!   supervisor actor ──┐
//!   subscriber workers ┴──► Bus ──┬──► fan-out task ──► SubscriberSet
//!                                 └──► Pool::subscribe() receivers
//! ```
//!
//! ## Rules
//! - `publish()` never blocks and never fails; events without receivers are dropped.
//! - The ring buffer is bounded; slow receivers see `RecvError::Lagged(n)`.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for [`Event`]s.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a bus holding at most `capacity` undelivered events (clamped to ≥ 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to all current receivers.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a receiver for events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}
