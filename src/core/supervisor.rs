//! # Supervisor actor: the single owner of all pool state.
//!
//! Every input is a [`Mail`] delivered through one unbounded queue and handled
//! to completion before the next one, so pool state needs no locks.
//!
//! ```text
//!   Pool handle ── Command ──┐
//!   worker reader tasks ─────┼── Message / Exited ──► mailbox ──► Supervisor::run
//!   timer tasks ─────────────┘      Timer                              │
//!                                                                      ├─► Launch::launch (spawn)
//!                                                                      ├─► worker outbox (die / ready)
//!                                                                      └─► Bus::publish (events)
//! ```
//!
//! ## Bookkeeping
//! - `workers`: every tracked child (spawning, spawned, terminating)
//! - `rotation`: ids of spawned workers in spawn order; any change resets `cursor`
//! - `pending`: routes waiting for the first spawned worker
//! - `watched`: workers whose startup watchdog has not fired yet
//!
//! ## Crash rule
//! An exit is *unexpected* when the worker was neither terminating nor killed
//! and the pool is not closing. For regular workers, with `keep_alive` and
//! fewer live workers than desired:
//! - with a [`BackoffPolicy`](crate::BackoffPolicy), the crash enters the
//!   respawn sequence whatever the worker's age; fast failures surface as
//!   `UnsuccessfulStartup` and as failed attempts;
//! - without one, a worker older than `min_expected_lifetime` is replaced and
//!   a younger one is not (`RespawnSuppressed`).
//!
//! Crashes during a reload are held back and judged only if the reload fails.
//! Reload cohorts and respawn candidates have their own exit handling (see
//! `reload.rs`, `respawn.rs`).

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use super::config::PoolConfig;
use super::reload::{ReloadReply, ReloadRound};
use super::respawn::RespawnSequence;
use super::worker::{Role, Worker, WorkerId, WorkerInfo, WorkerState};
use crate::channel::ControlMessage;
use crate::error::PoolError;
use crate::events::{Bus, Event, EventKind};
use crate::process::{ExitReason, Launch};
use crate::routing::{RequestMeta, RouteTarget, RoutingPolicy};
use crate::worker::Bootstrap;

/// Delay past `min_expected_lifetime` before the startup watchdog fires.
///
/// Also the shortest run that proves a respawn candidate healthy.
pub(super) const WATCHDOG_SLACK: Duration = Duration::from_millis(10);

type RouteReply = oneshot::Sender<Result<RouteTarget, PoolError>>;

/// Requests from [`Pool`](crate::Pool) handles.
pub(crate) enum Command {
    Route { meta: RequestMeta, reply: RouteReply },
    Reload { reply: ReloadReply },
    Ready { id: WorkerId, reply: oneshot::Sender<bool> },
    Workers { reply: oneshot::Sender<Vec<WorkerInfo>> },
    Shutdown { hard: bool, reply: Option<oneshot::Sender<()>> },
}

/// One-shot timers owned by the actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Timer {
    /// `min_expected_lifetime` (plus slack) elapsed since launch.
    Watchdog(WorkerId),
    /// A terminating worker used up `worker_timeout + kill_slack`.
    GraceExpired(WorkerId),
    /// Next respawn attempt of the given sequence generation.
    RespawnDue { generation: u64 },
}

/// Everything the actor reacts to.
pub(crate) enum Mail {
    Command(Command),
    Message { id: WorkerId, msg: ControlMessage },
    Exited { id: WorkerId, reason: ExitReason },
    Timer(Timer),
}

/// Sending side of the actor queue.
#[derive(Clone)]
pub(crate) struct Mailbox {
    tx: mpsc::UnboundedSender<Mail>,
}

impl Mailbox {
    pub(crate) fn new() -> (Self, mpsc::UnboundedReceiver<Mail>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub(crate) fn command(&self, cmd: Command) -> Result<(), PoolError> {
        self.tx
            .send(Mail::Command(cmd))
            .map_err(|_| PoolError::Closed)
    }

    pub(crate) fn message(&self, id: WorkerId, msg: ControlMessage) {
        let _ = self.tx.send(Mail::Message { id, msg });
    }

    pub(crate) fn exited(&self, id: WorkerId, reason: ExitReason) {
        let _ = self.tx.send(Mail::Exited { id, reason });
    }

    /// Delivers `timer` after `after`.
    pub(crate) fn timer(&self, after: Duration, timer: Timer) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            time::sleep(after).await;
            let _ = tx.send(Mail::Timer(timer));
        });
    }
}

struct Stopping {
    hard: bool,
    waiters: Vec<oneshot::Sender<()>>,
}

pub(crate) struct Supervisor {
    pub(super) cfg: PoolConfig,
    pub(super) desired: usize,
    bootstrap: Bootstrap,
    launcher: Arc<dyn Launch>,
    policy: Arc<dyn RoutingPolicy>,
    pub(super) bus: Bus,
    pub(super) mailbox: Mailbox,

    pub(super) workers: HashMap<WorkerId, Worker>,
    pub(super) rotation: Vec<WorkerId>,
    cursor: Option<usize>,
    next_id: u64,
    watched: HashMap<WorkerId, u32>,
    pending: VecDeque<(RequestMeta, RouteReply)>,

    pub(super) reload: Option<ReloadRound>,
    pub(super) respawn: RespawnSequence,
    stopping: Option<Stopping>,
    done: CancellationToken,
}

impl Supervisor {
    pub(crate) fn new(
        cfg: PoolConfig,
        bootstrap: Bootstrap,
        launcher: Arc<dyn Launch>,
        policy: Arc<dyn RoutingPolicy>,
        bus: Bus,
        mailbox: Mailbox,
        done: CancellationToken,
    ) -> Self {
        let desired = cfg.workers.resolve();
        Self {
            cfg,
            desired,
            bootstrap,
            launcher,
            policy,
            bus,
            mailbox,
            workers: HashMap::new(),
            rotation: Vec::new(),
            cursor: None,
            next_id: 0,
            watched: HashMap::new(),
            pending: VecDeque::new(),
            reload: None,
            respawn: RespawnSequence::default(),
            stopping: None,
            done,
        }
    }

    /// Actor loop: starts the initial workers, then handles mail until every
    /// worker has exited after a shutdown.
    pub(crate) async fn run(mut self, mut inbox: mpsc::UnboundedReceiver<Mail>) {
        info!(workers = self.desired, payload = %self.bootstrap.payload, "starting worker pool");
        for _ in 0..self.desired {
            self.spawn_worker(Role::Regular);
        }

        while let Some(mail) = inbox.recv().await {
            match mail {
                Mail::Command(cmd) => self.on_command(cmd),
                Mail::Message { id, msg } => self.on_message(id, msg),
                Mail::Exited { id, reason } => self.on_exit(id, reason),
                Mail::Timer(timer) => self.on_timer(timer),
            }
            if self.stopping.is_some() && self.workers.is_empty() {
                self.finish();
                break;
            }
        }
        self.done.cancel();
    }

    pub(super) fn is_shutting_down(&self) -> bool {
        self.stopping.is_some()
    }

    // ---- workers ----

    /// Launches one worker; `None` if the launcher failed.
    pub(super) fn spawn_worker(&mut self, role: Role) -> Option<WorkerId> {
        let launched = match self.launcher.launch(&self.bootstrap) {
            Ok(launched) => launched,
            Err(err) => {
                error!(error = %err, "failed to launch worker");
                self.bus
                    .publish(Event::new(EventKind::LaunchFailed).with_reason(err.to_string()));
                return None;
            }
        };

        self.next_id += 1;
        let id = WorkerId(self.next_id);
        let worker = Worker::attach(id, role, launched, self.mailbox.clone());
        let pid = worker.pid;
        self.workers.insert(id, worker);
        debug!(worker = %id, pid, ?role, "worker launched");
        self.bus
            .publish(Event::new(EventKind::WorkerLaunched).with_worker(id, pid));

        if self.cfg.min_lifetime().is_some() || role == Role::Candidate {
            self.watched.insert(id, pid);
            self.mailbox.timer(self.proving_window(), Timer::Watchdog(id));
        }
        Some(id)
    }

    /// Graceful stop: `die(grace)`, out of the rotation, killed if still alive
    /// after `grace + kill_slack`.
    pub(super) fn terminate_worker(&mut self, id: WorkerId, grace: Duration) {
        let Some(w) = self.workers.get_mut(&id) else {
            return;
        };
        if !w.terminate(grace) {
            return;
        }
        let pid = w.pid;
        debug!(worker = %id, pid, ?grace, "terminating worker");
        self.leave_rotation(id);
        self.bus.publish(
            Event::new(EventKind::WorkerTerminating)
                .with_worker(id, pid)
                .with_timeout(grace),
        );
        self.mailbox.timer(
            grace.saturating_add(self.cfg.kill_slack),
            Timer::GraceExpired(id),
        );
    }

    /// Immediate stop without grace.
    pub(super) fn kill_worker(&mut self, id: WorkerId) {
        if let Some(w) = self.workers.get_mut(&id) {
            w.kill();
            self.leave_rotation(id);
        }
    }

    fn leave_rotation(&mut self, id: WorkerId) {
        if let Some(pos) = self.rotation.iter().position(|w| *w == id) {
            self.rotation.remove(pos);
            self.cursor = None;
        }
    }

    pub(super) fn publish_worker(&self, ev: Event, id: WorkerId) {
        let ev = match self.workers.get(&id) {
            Some(w) => ev.with_worker(id, w.pid),
            None => ev,
        };
        self.bus.publish(ev);
    }

    // ---- mail handlers ----

    fn on_command(&mut self, cmd: Command) {
        match cmd {
            Command::Route { meta, reply } => self.on_route(meta, reply),
            Command::Reload { reply } => self.start_reload(reply),
            Command::Ready { id, reply } => {
                let sent = match self.workers.get(&id) {
                    Some(w) if w.state == WorkerState::Spawning && !w.killed => {
                        w.send(ControlMessage::Ready);
                        true
                    }
                    _ => false,
                };
                let _ = reply.send(sent);
            }
            Command::Workers { reply } => {
                let mut infos: Vec<WorkerInfo> = self.workers.values().map(Worker::info).collect();
                infos.sort_by_key(|info| info.id);
                let _ = reply.send(infos);
            }
            Command::Shutdown { hard, reply } => self.on_shutdown(hard, reply),
        }
    }

    fn on_message(&mut self, id: WorkerId, msg: ControlMessage) {
        match msg {
            ControlMessage::Addr { addr } => self.on_addr(id, addr),
            ControlMessage::Ping => trace!(worker = %id, "ping"),
            other => debug!(worker = %id, kind = other.kind(), "ignoring message from worker"),
        }
    }

    fn on_addr(&mut self, id: WorkerId, addr: SocketAddr) {
        let Some(w) = self.workers.get_mut(&id) else {
            return;
        };
        if !w.mark_spawned(addr) {
            debug!(worker = %id, state = w.state.as_str(), "ignoring addr");
            return;
        }
        let (pid, role, age) = (w.pid, w.role, w.age());
        info!(worker = %id, pid, %addr, "worker spawned");

        self.rotation.push(id);
        self.cursor = None;
        self.bus.publish(
            Event::new(EventKind::WorkerSpawned)
                .with_worker(id, pid)
                .with_addr(addr),
        );

        if role == Role::Candidate && self.has_proven(age) {
            self.on_candidate_proven(id);
        }
        self.flush_pending();
        self.advance_reload();
    }

    fn on_exit(&mut self, id: WorkerId, reason: ExitReason) {
        let Some(w) = self.workers.remove(&id) else {
            return;
        };
        self.leave_rotation(id);

        let deliberate = w.is_stopping() || self.is_shutting_down();
        let mut ev = Event::new(EventKind::WorkerTerminated)
            .with_worker(id, w.pid)
            .with_exit(reason);
        if deliberate {
            self.watched.remove(&id);
            info!(worker = %id, pid = w.pid, %reason, "worker exited");
        } else {
            warn!(worker = %id, pid = w.pid, %reason, age = ?w.age(), "worker exited unexpectedly");
            ev = ev.with_reason("unexpected");
        }
        self.bus.publish(ev);

        match w.role {
            Role::Candidate => self.on_candidate_failed(id),
            Role::Cohort => self.on_cohort_exit(id, w.pid),
            Role::Regular if !deliberate => match self.reload.as_mut() {
                Some(round) => round.crashed.push((id, w.pid, w.age())),
                None => self.apply_crash_rule(id, w.pid, w.age()),
            },
            Role::Regular => {}
        }
        self.advance_reload();
    }

    pub(super) fn apply_crash_rule(&mut self, id: WorkerId, pid: u32, age: Duration) {
        if !self.cfg.keep_alive {
            return;
        }
        let live = self.workers.values().filter(|w| w.is_live()).count();
        if live >= self.desired {
            return;
        }
        if self.cfg.backoff.is_some() {
            self.respawn_worker();
            return;
        }
        if let Some(min) = self.cfg.min_lifetime() {
            if age < min {
                warn!(worker = %id, pid, ?age, ?min, "worker died too young, not respawning");
                self.bus.publish(
                    Event::new(EventKind::RespawnSuppressed)
                        .with_worker(id, pid)
                        .with_reason(format!(
                            "died after {}ms, minimum lifetime {}ms",
                            age.as_millis(),
                            min.as_millis()
                        )),
                );
                return;
            }
        }
        self.respawn_worker();
    }

    fn on_timer(&mut self, timer: Timer) {
        match timer {
            Timer::Watchdog(id) => self.on_watchdog(id),
            Timer::GraceExpired(id) => {
                let Some(w) = self.workers.get_mut(&id) else {
                    return;
                };
                if w.state != WorkerState::Terminating || w.killed {
                    return;
                }
                w.kill();
                let pid = w.pid;
                warn!(worker = %id, pid, "worker outlived its grace period, killed");
                self.bus.publish(
                    Event::new(EventKind::GraceExceeded)
                        .with_worker(id, pid)
                        .with_timeout(self.cfg.kill_after()),
                );
            }
            Timer::RespawnDue { generation } => self.on_respawn_due(generation),
        }
    }

    fn on_watchdog(&mut self, id: WorkerId) {
        let Some(pid) = self.watched.remove(&id) else {
            return;
        };
        match self.workers.get(&id) {
            Some(w) if w.state == WorkerState::Spawned => {
                if w.role == Role::Candidate {
                    self.on_candidate_proven(id);
                }
            }
            Some(w) if w.is_stopping() => {}
            _ if self.cfg.min_lifetime().is_none() => {}
            _ => {
                warn!(worker = %id, pid, "worker did not start within its minimum lifetime");
                self.bus
                    .publish(Event::new(EventKind::UnsuccessfulStartup).with_worker(id, pid));
            }
        }
    }

    // ---- routing ----

    fn on_route(&mut self, meta: RequestMeta, reply: RouteReply) {
        if self.is_shutting_down() {
            let _ = reply.send(Err(PoolError::Closed));
            return;
        }
        match self.select(&meta) {
            Some(target) => {
                let _ = reply.send(Ok(target));
            }
            None => {
                trace!("no spawned worker, deferring route");
                self.pending.push_back((meta, reply));
            }
        }
    }

    fn select(&mut self, meta: &RequestMeta) -> Option<RouteTarget> {
        let idx = self
            .policy
            .select(meta, self.rotation.len(), &mut self.cursor)?;
        let id = *self.rotation.get(idx)?;
        let addr = self.workers.get(&id)?.addr?;
        Some(RouteTarget { worker: id, addr })
    }

    fn flush_pending(&mut self) {
        while let Some((meta, reply)) = self.pending.pop_front() {
            if reply.is_closed() {
                continue;
            }
            match self.select(&meta) {
                Some(target) => {
                    let _ = reply.send(Ok(target));
                }
                None => {
                    self.pending.push_front((meta, reply));
                    break;
                }
            }
        }
    }

    // ---- shutdown ----

    fn on_shutdown(&mut self, hard: bool, reply: Option<oneshot::Sender<()>>) {
        let first = self.stopping.is_none();
        let stopping = self.stopping.get_or_insert_with(|| Stopping {
            hard: false,
            waiters: Vec::new(),
        });
        if let Some(reply) = reply {
            stopping.waiters.push(reply);
        }
        let escalate = hard && !stopping.hard;
        stopping.hard |= hard;

        if first {
            info!(hard, "shutting down worker pool");
            self.bus.publish(Event::new(EventKind::ShutdownRequested));
            self.respawn.reset();
            self.abort_reload();
            for (_, reply) in self.pending.drain(..) {
                let _ = reply.send(Err(PoolError::Closed));
            }
        }
        if !(first || escalate) {
            return;
        }

        let ids: Vec<(WorkerId, WorkerState)> =
            self.workers.values().map(|w| (w.id, w.state)).collect();
        for (id, state) in ids {
            match state {
                _ if hard => self.kill_worker(id),
                WorkerState::Spawning => self.kill_worker(id),
                WorkerState::Spawned => self.terminate_worker(id, self.cfg.worker_timeout),
                WorkerState::Terminating | WorkerState::Terminated => {}
            }
        }
    }

    fn finish(&mut self) {
        info!("all workers stopped");
        self.bus.publish(Event::new(EventKind::AllStopped));
        if let Some(stopping) = self.stopping.take() {
            for waiter in stopping.waiters {
                let _ = waiter.send(());
            }
        }
    }
}
