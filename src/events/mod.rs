//! Pool notifications: types and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] classification and metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Notification names
//! | Notification          | [`EventKind`]                        |
//! |-----------------------|--------------------------------------|
//! | `spawn`               | [`EventKind::WorkerSpawned`]         |
//! | `terminate`           | [`EventKind::WorkerTerminated`]      |
//! | `reload`              | [`EventKind::ReloadCompleted`]       |
//! | `respawn`             | [`EventKind::Respawn`]               |
//! | `unsuccessfulStartup` | [`EventKind::UnsuccessfulStartup`]   |
//! | `respawnExhausted`    | [`EventKind::RespawnExhausted`]      |

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
