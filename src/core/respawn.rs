//! # Replacement of crashed workers.
//!
//! Without a [`BackoffPolicy`] every qualifying crash starts one replacement
//! right away. With a policy, replacements run as one sequence per pool:
//!
//! ```text
//! crash ─► owed += 1 ─► schedule(attempt) ── delay ──► spawn candidate
//!                          ▲                                │
//!                          │ candidate exits unproven       │ candidate proves itself
//!                          └────────────────────────────────┤ (spawned, and alive past
//!                                                           │  min_expected_lifetime)
//!            attempts == max_attempts ─► RespawnExhausted   ▼
//!                                                  owed -= 1, attempts = 0
//! ```
//!
//! A candidate proves itself by staying alive for `min_expected_lifetime`
//! plus a short slack, even when the lifetime is zero; a worker that binds and
//! then dies right away is still a failed attempt. Only one candidate is in
//! flight at a time. The sequence is cancelled by shutdown and reset by a
//! reload.

use std::time::Duration;

use tracing::{debug, warn};

use super::supervisor::{Supervisor, Timer, WATCHDOG_SLACK};
use super::worker::{Role, WorkerId};
use crate::events::{Event, EventKind};
use crate::policies::BackoffPolicy;

/// State of the pool's respawn sequence.
#[derive(Debug, Default)]
pub(crate) struct RespawnSequence {
    /// Replacements still needed.
    pub(crate) owed: usize,
    /// Unsuccessful attempts since the sequence (re)started.
    pub(crate) attempts: u32,
    /// Candidate currently proving itself.
    pub(crate) candidate: Option<WorkerId>,
    /// A `RespawnDue` timer is pending.
    pub(crate) scheduled: bool,
    /// `max_attempts` reached; no more respawns until reset.
    pub(crate) exhausted: bool,
    /// Invalidates timers of a cancelled sequence.
    pub(crate) generation: u64,
}

impl RespawnSequence {
    /// Drops all progress and invalidates pending timers.
    pub(crate) fn reset(&mut self) {
        let generation = self.generation.wrapping_add(1);
        *self = Self {
            generation,
            ..Self::default()
        };
    }

    fn is_idle(&self) -> bool {
        self.candidate.is_none() && !self.scheduled
    }
}

impl Supervisor {
    /// Replaces one crashed worker.
    pub(crate) fn respawn_worker(&mut self) {
        let Some(policy) = self.cfg.backoff else {
            if let Some(id) = self.spawn_worker(Role::Regular) {
                self.publish_worker(Event::new(EventKind::Respawn), id);
            }
            return;
        };

        if self.respawn.exhausted {
            warn!("respawn attempts exhausted, not replacing crashed worker");
            return;
        }
        self.respawn.owed += 1;
        if self.respawn.is_idle() {
            self.schedule_respawn(&policy);
        }
    }

    /// Schedules the next attempt, or gives up when the policy says so.
    fn schedule_respawn(&mut self, policy: &BackoffPolicy) {
        let attempts = self.respawn.attempts;
        if policy.is_exhausted(attempts) {
            warn!(attempts, "giving up on respawning workers");
            self.respawn.exhausted = true;
            self.respawn.owed = 0;
            self.bus
                .publish(Event::new(EventKind::RespawnExhausted).with_attempt(attempts));
            return;
        }

        let delay = policy.next(attempts);
        debug!(attempt = attempts + 1, ?delay, "respawn scheduled");
        self.bus.publish(
            Event::new(EventKind::BackoffScheduled)
                .with_attempt(attempts + 1)
                .with_delay(delay),
        );
        self.respawn.scheduled = true;
        self.mailbox.timer(
            delay,
            Timer::RespawnDue {
                generation: self.respawn.generation,
            },
        );
    }

    /// Timer callback: start the scheduled candidate.
    pub(crate) fn on_respawn_due(&mut self, generation: u64) {
        if generation != self.respawn.generation || self.is_shutting_down() {
            return;
        }
        let Some(policy) = self.cfg.backoff else {
            return;
        };
        self.respawn.scheduled = false;

        match self.spawn_worker(Role::Candidate) {
            Some(id) => {
                self.respawn.candidate = Some(id);
                self.publish_worker(
                    Event::new(EventKind::Respawn).with_attempt(self.respawn.attempts + 1),
                    id,
                );
            }
            None => {
                self.respawn.attempts += 1;
                self.schedule_respawn(&policy);
            }
        }
    }

    /// The candidate exited before proving itself.
    pub(crate) fn on_candidate_failed(&mut self, id: WorkerId) {
        if self.respawn.candidate != Some(id) {
            return;
        }
        self.respawn.candidate = None;
        self.respawn.attempts += 1;
        if self.is_shutting_down() {
            return;
        }
        if let Some(policy) = self.cfg.backoff {
            self.schedule_respawn(&policy);
        }
    }

    /// The candidate is spawned and old enough; it joins the serving set.
    pub(crate) fn on_candidate_proven(&mut self, id: WorkerId) {
        if self.respawn.candidate != Some(id) {
            return;
        }
        if let Some(w) = self.workers.get_mut(&id) {
            w.role = Role::Regular;
        }
        debug!(worker = %id, "replacement proved itself");
        self.respawn.candidate = None;
        self.respawn.attempts = 0;
        self.respawn.owed = self.respawn.owed.saturating_sub(1);

        if self.respawn.owed > 0 {
            if let Some(policy) = self.cfg.backoff {
                self.schedule_respawn(&policy);
            }
        }
    }

    /// How long a candidate must stay alive to prove itself.
    pub(crate) fn proving_window(&self) -> Duration {
        self.cfg.min_expected_lifetime + WATCHDOG_SLACK
    }

    /// Whether a spawned candidate of age `age` has outlived the proving window.
    pub(crate) fn has_proven(&self, age: Duration) -> bool {
        age >= self.proving_window()
    }
}
