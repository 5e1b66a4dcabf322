//! # Subscriber trait.
//!
//! Each subscriber runs on its own worker task fed by a bounded queue owned by
//! the [`SubscriberSet`](crate::SubscriberSet). A slow subscriber never delays
//! the supervisor; when its queue is full, events for it are dropped and a
//! `SubscriberOverflow` event is published instead.

use async_trait::async_trait;

use crate::events::Event;

/// Contract for notification subscribers.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handles one event.
    async fn on_event(&self, event: &Event);

    /// Name used in logs and health events.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Capacity of this subscriber's queue.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
