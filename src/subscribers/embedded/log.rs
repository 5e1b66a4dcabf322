//! # LogWriter: events as `tracing` records
//!
//! Renders every [`Event`] as one structured record under the
//! `poolvisor::events` target. Recovery failures log at `warn`/`error`,
//! routine lifecycle at `info`.
//!
//! ## Example output (compact format)
//! ```text
//! INFO poolvisor::events: [spawned] worker=3 pid=48121 addr=127.0.0.1:40411
//! WARN poolvisor::events: [terminated] worker=3 pid=48121 exit="exit code 1" reason="unexpected"
//! WARN poolvisor::events: [respawn-suppressed] worker=3 pid=48121 reason="died after 120ms"
//! INFO poolvisor::events: [backoff] attempt=2 delay_ms=200
//! ERROR poolvisor::events: [respawn-exhausted] attempts=5
//! ```

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

const TARGET: &str = "poolvisor::events";

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let worker = e.worker.map(|w| w.get());
        let reason = e.reason.as_deref();
        let exit = e.exit.map(|x| x.description());

        match e.kind {
            EventKind::WorkerLaunched => {
                info!(target: TARGET, ?worker, pid = ?e.pid, "[launched]");
            }
            EventKind::LaunchFailed => {
                error!(target: TARGET, ?reason, "[launch-failed]");
            }
            EventKind::WorkerSpawned => {
                info!(target: TARGET, ?worker, pid = ?e.pid, addr = ?e.addr, "[spawned]");
            }
            EventKind::WorkerTerminating => {
                info!(target: TARGET, ?worker, pid = ?e.pid, timeout_ms = ?e.timeout_ms, "[terminating]");
            }
            EventKind::WorkerTerminated => {
                if reason.is_some() {
                    warn!(target: TARGET, ?worker, pid = ?e.pid, ?exit, ?reason, "[terminated]");
                } else {
                    info!(target: TARGET, ?worker, pid = ?e.pid, ?exit, "[terminated]");
                }
            }
            EventKind::UnsuccessfulStartup => {
                warn!(target: TARGET, ?worker, pid = ?e.pid, "[unsuccessful-startup]");
            }
            EventKind::RespawnSuppressed => {
                warn!(target: TARGET, ?worker, pid = ?e.pid, ?reason, "[respawn-suppressed]");
            }
            EventKind::BackoffScheduled => {
                info!(target: TARGET, attempt = ?e.attempt, delay_ms = ?e.delay_ms, "[backoff]");
            }
            EventKind::Respawn => {
                info!(target: TARGET, ?worker, pid = ?e.pid, attempt = ?e.attempt, "[respawn]");
            }
            EventKind::RespawnExhausted => {
                error!(target: TARGET, attempts = ?e.attempt, "[respawn-exhausted]");
            }
            EventKind::ReloadCompleted => {
                info!(target: TARGET, "[reload]");
            }
            EventKind::ReloadFailed => {
                error!(target: TARGET, ?worker, ?reason, "[reload-failed]");
            }
            EventKind::GraceExceeded => {
                warn!(target: TARGET, ?worker, pid = ?e.pid, timeout_ms = ?e.timeout_ms, "[grace-exceeded]");
            }
            EventKind::ShutdownRequested => {
                info!(target: TARGET, "[shutdown-requested]");
            }
            EventKind::AllStopped => {
                info!(target: TARGET, "[all-stopped]");
            }
            EventKind::SubscriberOverflow => {
                warn!(target: TARGET, ?reason, "[subscriber-overflow]");
            }
            EventKind::SubscriberPanicked => {
                error!(target: TARGET, ?reason, "[subscriber-panicked]");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
