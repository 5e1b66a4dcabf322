//! Named preload hooks and payloads compiled into a worker binary.
//!
//! The supervisor only ships names (see [`Bootstrap`]); the worker resolves
//! them here. Preloads run in the order listed in `requires`, all of them
//! before the payload is looked up.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::bootstrap::Bootstrap;
use super::payload::Payload;
use crate::error::WorkerError;

/// Hook run before the payload is resolved (environment setup and the like).
pub type PreloadFn = Arc<dyn Fn(&Bootstrap) -> Result<(), String> + Send + Sync>;

/// Lookup table from names to preload hooks and payloads.
#[derive(Clone, Default)]
pub struct WorkerRegistry {
    preloads: HashMap<String, PreloadFn>,
    payloads: HashMap<String, Arc<dyn Payload>>,
}

impl WorkerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a preload hook under `name`.
    pub fn preload<F>(mut self, name: impl Into<String>, hook: F) -> Self
    where
        F: Fn(&Bootstrap) -> Result<(), String> + Send + Sync + 'static,
    {
        self.preloads.insert(name.into(), Arc::new(hook));
        self
    }

    /// Registers a payload under `name`.
    pub fn payload<P: Payload>(mut self, name: impl Into<String>, payload: P) -> Self {
        self.payloads.insert(name.into(), Arc::new(payload));
        self
    }

    /// Runs every hook named in `bootstrap.requires`, in order.
    ///
    /// Stops at the first unknown or failing hook.
    pub fn run_preloads(&self, bootstrap: &Bootstrap) -> Result<(), WorkerError> {
        for name in &bootstrap.requires {
            let hook = self.preloads.get(name).ok_or_else(|| WorkerError::Preload {
                name: name.clone(),
                reason: "not registered".into(),
            })?;
            hook(bootstrap).map_err(|reason| WorkerError::Preload {
                name: name.clone(),
                reason,
            })?;
            debug!(preload = %name, "preload done");
        }
        Ok(())
    }

    /// Looks up a payload by name.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Payload>, WorkerError> {
        self.payloads
            .get(name)
            .cloned()
            .ok_or_else(|| WorkerError::UnknownPayload(name.to_string()))
    }
}

impl fmt::Debug for WorkerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerRegistry")
            .field("preloads", &self.preloads.keys().collect::<Vec<_>>())
            .field("payloads", &self.payloads.keys().collect::<Vec<_>>())
            .finish()
    }
}
