//! # Pool construction.
//!
//! [`PoolBuilder`] collects the payload name, [`PoolConfig`], and optional
//! launcher, routing policy, and subscribers, then starts the supervisor actor.
//!
//! ```text
//! PoolBuilder::new(payload, cfg)
//!     .with_launcher(..) / .with_routing(..) / .subscriber(..)
//!     .build() ─► Bus ─► fan-out task (if subscribers) ─► Supervisor::run ─► Pool
//! ```

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::config::PoolConfig;
use super::pool::Pool;
use super::supervisor::{Mailbox, Supervisor};
use crate::error::PoolError;
use crate::events::Bus;
use crate::process::{Launch, ProcessLauncher, WorkerCommand};
use crate::routing::{RoutingPolicy, StickyRoundRobin};
use crate::subscribers::{Subscribe, SubscriberSet};

/// Builder for a [`Pool`].
pub struct PoolBuilder {
    payload: String,
    cfg: PoolConfig,
    launcher: Option<Arc<dyn Launch>>,
    command: Option<WorkerCommand>,
    policy: Arc<dyn RoutingPolicy>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl PoolBuilder {
    /// Pool of workers running the payload registered as `payload`.
    pub fn new(payload: impl Into<String>, cfg: PoolConfig) -> Self {
        Self {
            payload: payload.into(),
            cfg,
            launcher: None,
            command: None,
            policy: Arc::new(StickyRoundRobin),
            subscribers: Vec::new(),
        }
    }

    /// Executable started for each worker (default: the current executable).
    pub fn with_command(mut self, command: WorkerCommand) -> Self {
        self.command = Some(command);
        self
    }

    /// Replaces the process launcher altogether.
    pub fn with_launcher<L: Launch>(mut self, launcher: L) -> Self {
        self.launcher = Some(Arc::new(launcher));
        self
    }

    /// Replaces the default sticky/round-robin routing.
    pub fn with_routing<P: RoutingPolicy>(mut self, policy: P) -> Self {
        self.policy = Arc::new(policy);
        self
    }

    /// Sets event subscribers.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Adds one event subscriber.
    pub fn subscriber<S: Subscribe>(mut self, subscriber: S) -> Self {
        self.subscribers.push(Arc::new(subscriber));
        self
    }

    /// Starts the supervisor and the initial workers.
    ///
    /// Must be called inside a tokio runtime.
    pub fn build(self) -> Result<Pool, PoolError> {
        let launcher: Arc<dyn Launch> = match self.launcher {
            Some(launcher) => launcher,
            None => {
                let command = match self.command {
                    Some(command) => command,
                    None => WorkerCommand::current_exe().map_err(|e| PoolError::Launch {
                        reason: e.to_string(),
                    })?,
                };
                Arc::new(ProcessLauncher::new(command))
            }
        };

        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let done = CancellationToken::new();
        if !self.subscribers.is_empty() {
            let set = SubscriberSet::new(self.subscribers, bus.clone());
            spawn_fanout(&bus, set, done.clone());
        }

        let bootstrap = self.cfg.bootstrap(&self.payload);
        let (mailbox, inbox) = Mailbox::new();
        let supervisor = Supervisor::new(
            self.cfg,
            bootstrap,
            launcher,
            self.policy,
            bus.clone(),
            mailbox.clone(),
            done,
        );
        let desired = supervisor.desired;
        tokio::spawn(supervisor.run(inbox));

        Ok(Pool::new(mailbox, bus, desired))
    }
}

/// Forwards bus events to the subscribers until the supervisor is done.
fn spawn_fanout(bus: &Bus, set: SubscriberSet, done: CancellationToken) {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                res = rx.recv() => match res {
                    Ok(ev) => set.emit(ev),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "subscriber fan-out lagged behind the bus");
                    }
                    Err(RecvError::Closed) => break,
                },
                () = done.cancelled() => break,
            }
        }
        set.shutdown().await;
    });
}
