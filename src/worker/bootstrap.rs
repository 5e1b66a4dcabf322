//! Worker process startup contract.
//!
//! The supervisor serializes a [`Bootstrap`] into the [`BOOTSTRAP_ENV`]
//! environment variable of every child. The worker side reads it back in
//! [`Bootstrap::from_env`] before doing anything else.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::WorkerError;

/// Environment variable carrying the JSON-encoded [`Bootstrap`].
pub const BOOTSTRAP_ENV: &str = "POOLVISOR_BOOTSTRAP";

/// Everything a worker needs to know at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bootstrap {
    /// Registered name of the payload to run.
    pub payload: String,
    /// Preload hooks, run in this order before the payload is resolved.
    #[serde(default)]
    pub requires: Vec<String>,
    /// Report `addr` as soon as the listener is bound.
    #[serde(default = "default_assume_ready")]
    pub assume_ready: bool,
    /// Optional process title prefix (`"<title> worker"`).
    #[serde(default)]
    pub title: Option<String>,
    /// Heartbeat interval in milliseconds (`None` = no heartbeat).
    #[serde(default)]
    pub ping_interval_ms: Option<u64>,
}

fn default_assume_ready() -> bool {
    true
}

impl Bootstrap {
    /// Creates a bootstrap for `payload` with defaults for everything else.
    pub fn new(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
            requires: Vec::new(),
            assume_ready: true,
            title: None,
            ping_interval_ms: None,
        }
    }

    /// Heartbeat interval, if any (`0` is treated as disabled).
    pub fn ping_interval(&self) -> Option<Duration> {
        self.ping_interval_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }

    /// Full process title, if a prefix is configured.
    pub fn process_title(&self) -> Option<String> {
        self.title.as_ref().map(|t| format!("{t} worker"))
    }

    /// Encodes for the environment.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decodes from an environment value.
    pub fn decode(raw: &str) -> Result<Self, WorkerError> {
        serde_json::from_str(raw).map_err(|e| WorkerError::Bootstrap(e.to_string()))
    }

    /// Reads the bootstrap of the current process.
    ///
    /// Returns `Ok(None)` when the process was not started by a pool.
    pub fn from_env() -> Result<Option<Self>, WorkerError> {
        match std::env::var(BOOTSTRAP_ENV) {
            Ok(raw) => Self::decode(&raw).map(Some),
            Err(std::env::VarError::NotPresent) => Ok(None),
            Err(e) => Err(WorkerError::Bootstrap(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode() {
        let mut b = Bootstrap::new("hello");
        b.requires = vec!["env".into(), "tls".into()];
        b.assume_ready = false;
        b.title = Some("learnboost".into());
        b.ping_interval_ms = Some(15);

        let decoded = Bootstrap::decode(&b.encode().unwrap()).unwrap();
        assert_eq!(decoded, b);
        assert_eq!(decoded.ping_interval(), Some(Duration::from_millis(15)));
        assert_eq!(decoded.process_title().as_deref(), Some("learnboost worker"));
    }

    #[test]
    fn test_defaults_when_fields_missing() {
        let b = Bootstrap::decode(r#"{"payload":"hello"}"#).unwrap();
        assert!(b.requires.is_empty());
        assert!(b.assume_ready);
        assert_eq!(b.ping_interval(), None);
        assert_eq!(b.process_title(), None);
    }

    #[test]
    fn test_zero_ping_interval_disables_heartbeat() {
        let mut b = Bootstrap::new("hello");
        b.ping_interval_ms = Some(0);
        assert_eq!(b.ping_interval(), None);
    }

    #[test]
    fn test_malformed_bootstrap() {
        let err = Bootstrap::decode("{").unwrap_err();
        assert_eq!(err.as_label(), "worker_bootstrap");
    }
}
