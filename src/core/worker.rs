//! # Supervisor-side view of one worker process.
//!
//! ```text
//!            addr            die(grace)          exit
//! spawning ───────► spawned ───────────► terminating ───────► terminated
//!     │                                                          ▲
//!     └──────────────── kill / exit ─────────────────────────────┘
//! ```
//!
//! [`Worker`] is owned by the supervisor actor and mutated only there. Its
//! child is served by two tasks spawned in [`Worker::attach`]:
//! - **reader**: forwards control messages, then the exit reason, to the actor
//!   mailbox. Messages already readable are forwarded before the exit.
//! - **writer**: drains the worker's outbox into the child's stdin.

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, trace};

use super::supervisor::Mailbox;
use crate::channel::{ChannelReader, ChannelWriter, ControlMessage};
use crate::process::Launched;

/// Pool-unique worker identity (never reused within a pool).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId(pub(crate) u64);

impl WorkerId {
    /// Numeric value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkerState {
    /// Started, not yet listening.
    Spawning,
    /// Listening and in the routing rotation.
    Spawned,
    /// Asked to exit; out of the rotation.
    Terminating,
    /// Exited.
    Terminated,
}

impl WorkerState {
    /// Stable lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            WorkerState::Spawning => "spawning",
            WorkerState::Spawned => "spawned",
            WorkerState::Terminating => "terminating",
            WorkerState::Terminated => "terminated",
        }
    }
}

/// Snapshot of a worker for operators.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkerInfo {
    /// Worker identity.
    pub id: WorkerId,
    /// OS process id.
    pub pid: u32,
    /// Current state.
    pub state: WorkerState,
    /// Listen address once spawned.
    pub addr: Option<SocketAddr>,
    /// Time since the process was started.
    pub age: Duration,
}

/// Why a worker exists; decides what its exit means.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Role {
    /// Member of the serving set; crashes go through the crash rule.
    Regular,
    /// Member of an in-flight reload cohort.
    Cohort,
    /// Replacement started by a backoff sequence, not yet proven.
    Candidate,
}

pub(crate) struct Worker {
    pub(crate) id: WorkerId,
    pub(crate) pid: u32,
    pub(crate) state: WorkerState,
    pub(crate) role: Role,
    pub(crate) addr: Option<SocketAddr>,
    pub(crate) born: Instant,
    /// Hard-killed by the supervisor (its exit is never a crash).
    pub(crate) killed: bool,
    outbox: mpsc::UnboundedSender<ControlMessage>,
    kill: Option<oneshot::Sender<()>>,
}

impl Worker {
    /// Wires a freshly launched child to the actor mailbox.
    pub(crate) fn attach(id: WorkerId, role: Role, launched: Launched, mailbox: Mailbox) -> Self {
        let Launched {
            pid,
            reader,
            writer,
            exit,
            kill,
        } = launched;

        let (outbox, mut outbound) = mpsc::unbounded_channel::<ControlMessage>();
        tokio::spawn(async move {
            let mut writer = ChannelWriter::new(writer);
            while let Some(msg) = outbound.recv().await {
                if let Err(err) = writer.send(&msg).await {
                    debug!(worker = %id, pid, error = %err, "control channel write failed");
                    break;
                }
            }
        });

        tokio::spawn(async move {
            let mut reader = ChannelReader::new(reader);
            let mut exit = exit;
            let mut reading = true;
            let reason = loop {
                tokio::select! {
                    biased;
                    msg = reader.recv(), if reading => match msg {
                        Ok(Some(msg)) => {
                            trace!(worker = %id, kind = msg.kind(), "control message");
                            mailbox.message(id, msg);
                        }
                        Ok(None) => reading = false,
                        Err(err) => {
                            debug!(worker = %id, pid, error = %err, "control channel read failed");
                            reading = false;
                        }
                    },
                    reason = &mut exit => break reason,
                }
            };
            mailbox.exited(id, reason);
        });

        Self {
            id,
            pid,
            state: WorkerState::Spawning,
            role,
            addr: None,
            born: Instant::now(),
            killed: false,
            outbox,
            kill: Some(kill),
        }
    }

    /// `spawning → spawned`. Returns `false` (and changes nothing) in any other state.
    pub(crate) fn mark_spawned(&mut self, addr: SocketAddr) -> bool {
        if self.state != WorkerState::Spawning || self.killed {
            return false;
        }
        self.state = WorkerState::Spawned;
        self.addr = Some(addr);
        true
    }

    /// Sends `die` and moves to `terminating`. No-op unless spawning or spawned.
    pub(crate) fn terminate(&mut self, grace: Duration) -> bool {
        if !matches!(self.state, WorkerState::Spawning | WorkerState::Spawned) || self.killed {
            return false;
        }
        self.send(ControlMessage::die(grace));
        self.state = WorkerState::Terminating;
        true
    }

    /// Kills the process without grace.
    pub(crate) fn kill(&mut self) {
        if let Some(kill) = self.kill.take() {
            debug!(worker = %self.id, pid = self.pid, "killing worker");
            let _ = kill.send(());
        }
        self.killed = true;
    }

    /// Queues a control message; lost if the child is gone.
    pub(crate) fn send(&self, msg: ControlMessage) {
        let _ = self.outbox.send(msg);
    }

    /// Whether the supervisor asked this worker to go away.
    pub(crate) fn is_stopping(&self) -> bool {
        self.killed || self.state == WorkerState::Terminating
    }

    /// Spawning or spawned and not on its way out.
    pub(crate) fn is_live(&self) -> bool {
        !self.is_stopping()
    }

    pub(crate) fn age(&self) -> Duration {
        self.born.elapsed()
    }

    pub(crate) fn info(&self) -> WorkerInfo {
        WorkerInfo {
            id: self.id,
            pid: self.pid,
            state: self.state,
            addr: self.addr,
            age: self.age(),
        }
    }
}
