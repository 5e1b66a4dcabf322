//! # Notification subscribers.
//!
//! [`Subscribe`] is the extension point for reacting to pool [`Event`](crate::Event)s
//! (alerting on `RespawnExhausted`, counting reloads, ...). Subscribers are
//! handed to [`PoolBuilder::subscriber`](crate::PoolBuilder::subscriber) and
//! driven through a [`SubscriberSet`].
//!
//! ```text
//!   supervisor ── publish ──► Bus ──► fan-out task ──► SubscriberSet
//!                                                       ├──► [queue] ─► LogWriter
//!                                                       └──► [queue] ─► custom
//! ```
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use poolvisor::{Event, EventKind, Subscribe};
//!
//! struct Pager;
//!
//! #[async_trait]
//! impl Subscribe for Pager {
//!     async fn on_event(&self, ev: &Event) {
//!         if ev.kind == EventKind::RespawnExhausted {
//!             // page whoever is on call
//!         }
//!     }
//!     fn name(&self) -> &'static str { "pager" }
//! }
//! ```

mod set;
mod subscribe;

#[cfg(feature = "logging")]
mod embedded;

#[cfg(feature = "logging")]
pub use embedded::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
