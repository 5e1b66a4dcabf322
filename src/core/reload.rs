//! # Cohort replacement.
//!
//! ## Graceful path (`worker_timeout > 0`)
//! ```text
//! reload ─► kill spawning ─► launch cohort ──(all spawned)──► die(grace) to old ─► Completed
//!                               │   new workers join the rotation as they spawn
//!                               └─ member exits first ─► retire cohort, keep old ─► ReloadFailed
//!                                                         (old crashes held back go through the crash rule)
//! ```
//!
//! ## Disruptive path (`worker_timeout == 0`)
//! ```text
//! reload ─► kill spawning, die(0) to spawned ──(none left)──► launch cohort ──(all spawned)──► Completed
//! ```
//!
//! At most one reload is in flight; further requests return [`Reload::Ignored`].

use std::collections::HashSet;
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use super::supervisor::Supervisor;
use super::worker::{Role, WorkerId, WorkerState};
use crate::error::PoolError;
use crate::events::{Event, EventKind};

/// Outcome of [`Pool::reload`](crate::Pool::reload).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reload {
    /// The new cohort replaced the old one.
    Completed,
    /// Another reload was already in flight; nothing was done.
    Ignored,
}

pub(crate) type ReloadReply = oneshot::Sender<Result<Reload, PoolError>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    /// Disruptive path: waiting for every old worker to exit.
    Draining,
    /// Waiting for every cohort member to spawn.
    AwaitCohort,
}

pub(crate) struct ReloadRound {
    pub(crate) phase: Phase,
    pub(crate) cohort: HashSet<WorkerId>,
    /// Workers serving before the reload (graceful path).
    pub(crate) old: Vec<WorkerId>,
    /// Regular workers that crashed during the round: `(id, pid, age)`.
    pub(crate) crashed: Vec<(WorkerId, u32, Duration)>,
    reply: Option<ReloadReply>,
}

impl Supervisor {
    /// Starts a reload, or answers `Ignored` if one is in flight.
    pub(crate) fn start_reload(&mut self, reply: ReloadReply) {
        if self.is_shutting_down() {
            let _ = reply.send(Err(PoolError::Closed));
            return;
        }
        if self.reload.is_some() {
            debug!("reload in progress, ignoring reload request");
            let _ = reply.send(Ok(Reload::Ignored));
            return;
        }

        let stale: Vec<WorkerId> = self
            .workers
            .values()
            .filter(|w| w.state == WorkerState::Spawning)
            .map(|w| w.id)
            .collect();
        for id in stale {
            self.kill_worker(id);
        }
        self.respawn.reset();

        let old = self.rotation.clone();
        info!(workers = self.desired, disruptive = self.cfg.is_disruptive_reload(), "reloading");

        self.reload = Some(ReloadRound {
            phase: Phase::Draining,
            cohort: HashSet::new(),
            old: Vec::new(),
            crashed: Vec::new(),
            reply: Some(reply),
        });

        if self.cfg.is_disruptive_reload() {
            for id in old {
                self.terminate_worker(id, Duration::ZERO);
            }
        } else {
            if let Some(round) = self.reload.as_mut() {
                round.old = old;
            }
            self.launch_cohort();
        }
        self.advance_reload();
    }

    fn launch_cohort(&mut self) {
        let mut cohort = HashSet::with_capacity(self.desired);
        let mut failed = 0usize;
        for _ in 0..self.desired {
            match self.spawn_worker(Role::Cohort) {
                Some(id) => {
                    cohort.insert(id);
                }
                None => failed += 1,
            }
        }
        if let Some(round) = self.reload.as_mut() {
            round.phase = Phase::AwaitCohort;
            round.cohort = cohort;
        }
        if failed > 0 {
            self.fail_reload(None, format!("{failed} cohort workers could not be launched"));
        }
    }

    /// Moves the in-flight reload forward after any worker transition.
    pub(crate) fn advance_reload(&mut self) {
        let Some(phase) = self.reload.as_ref().map(|r| r.phase) else {
            return;
        };
        match phase {
            Phase::Draining => {
                if self.workers.is_empty() {
                    debug!("old cohort gone, launching new cohort");
                    self.launch_cohort();
                    self.advance_reload();
                }
            }
            Phase::AwaitCohort => {
                let all_spawned = self.reload.as_ref().is_some_and(|round| {
                    round.cohort.iter().all(|id| {
                        self.workers
                            .get(id)
                            .is_some_and(|w| w.state == WorkerState::Spawned)
                    })
                });
                if all_spawned {
                    self.complete_reload();
                }
            }
        }
    }

    fn complete_reload(&mut self) {
        let Some(mut round) = self.reload.take() else {
            return;
        };
        for id in &round.cohort {
            if let Some(w) = self.workers.get_mut(id) {
                w.role = Role::Regular;
            }
        }
        for id in std::mem::take(&mut round.old) {
            self.terminate_worker(id, self.cfg.worker_timeout);
        }
        info!("reload complete");
        self.bus.publish(Event::new(EventKind::ReloadCompleted));
        if let Some(reply) = round.reply.take() {
            let _ = reply.send(Ok(Reload::Completed));
        }
    }

    /// A cohort member exited before the reload completed.
    pub(crate) fn on_cohort_exit(&mut self, id: WorkerId, pid: u32) {
        let member = self
            .reload
            .as_ref()
            .is_some_and(|r| r.cohort.contains(&id));
        if member {
            self.fail_reload(Some((id, pid)), format!("worker {id} exited before it was ready"));
        }
    }

    fn fail_reload(&mut self, culprit: Option<(WorkerId, u32)>, reason: String) {
        let Some(mut round) = self.reload.take() else {
            return;
        };
        warn!(%reason, "reload failed");

        let members: Vec<(WorkerId, WorkerState)> = round
            .cohort
            .iter()
            .filter_map(|id| self.workers.get(id).map(|w| (w.id, w.state)))
            .collect();
        for (id, state) in members {
            if self.cfg.is_disruptive_reload() {
                // The old cohort is gone; whatever came up keeps serving.
                if let Some(w) = self.workers.get_mut(&id) {
                    w.role = Role::Regular;
                }
                continue;
            }
            match state {
                WorkerState::Spawning => self.kill_worker(id),
                WorkerState::Spawned => self.terminate_worker(id, self.cfg.worker_timeout),
                _ => {}
            }
        }

        let mut ev = Event::new(EventKind::ReloadFailed).with_reason(reason.clone());
        if let Some((id, pid)) = culprit {
            ev = ev.with_worker(id, pid);
        }
        self.bus.publish(ev);
        if let Some(reply) = round.reply.take() {
            let _ = reply.send(Err(PoolError::ReloadFailed { reason }));
        }

        // The serving set stays; crashes it took during the round count now.
        for (id, pid, age) in round.crashed {
            self.apply_crash_rule(id, pid, age);
        }
    }

    /// Aborts the in-flight reload because the pool is closing.
    pub(crate) fn abort_reload(&mut self) {
        if let Some(mut round) = self.reload.take() {
            if let Some(reply) = round.reply.take() {
                let _ = reply.send(Err(PoolError::Closed));
            }
        }
    }
}
