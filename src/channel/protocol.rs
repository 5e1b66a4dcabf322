//! Wire protocol of the supervisor↔worker control channel.
//!
//! Messages are JSON objects tagged by a `type` field, one per line:
//!
//! ```text
//! worker → master   {"type":"addr","addr":"127.0.0.1:41234"}
//! master → worker   {"type":"ready"}
//! master → worker   {"type":"die","time":600000}
//! worker → master   {"type":"ping"}
//! ```
//!
//! Unknown `type` values decode to [`ControlMessage::Unknown`] and are dropped
//! by the readers instead of failing the channel.

use std::net::SocketAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// One control-channel message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ControlMessage {
    /// Worker is listening on `addr` and ready for traffic.
    Addr {
        /// Bound listen address.
        addr: SocketAddr,
    },

    /// Master asks a worker that deferred readiness to report `addr` now.
    Ready,

    /// Master asks the worker to exit once `time` milliseconds have elapsed.
    Die {
        /// Grace period in milliseconds.
        time: u64,
    },

    /// Worker heartbeat.
    Ping,

    /// Any message kind this version does not understand.
    #[serde(other)]
    Unknown,
}

impl ControlMessage {
    /// Creates an `addr` message.
    pub fn addr(addr: SocketAddr) -> Self {
        Self::Addr { addr }
    }

    /// Creates a `die` message carrying `grace` (millisecond precision).
    pub fn die(grace: Duration) -> Self {
        Self::Die {
            time: grace.as_millis().min(u128::from(u64::MAX)) as u64,
        }
    }

    /// Grace period of a `die` message.
    pub fn grace(&self) -> Option<Duration> {
        match self {
            Self::Die { time } => Some(Duration::from_millis(*time)),
            _ => None,
        }
    }

    /// Stable kind name, matching the wire discriminant.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Addr { .. } => "addr",
            Self::Ready => "ready",
            Self::Die { .. } => "die",
            Self::Ping => "ping",
            Self::Unknown => "unknown",
        }
    }

    /// Serialize to a JSON line (without the trailing newline; the codec adds it).
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from a JSON line.
    pub fn from_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line.trim())
    }
}
