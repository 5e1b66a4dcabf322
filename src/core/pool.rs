//! # Pool handle.
//!
//! [`Pool`] is a cheap, cloneable handle to the supervisor actor. Every method
//! sends a command and awaits the actor's answer; none of them touches pool
//! state directly.
//!
//! Dropping the last handle requests a graceful shutdown.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{broadcast, oneshot};

use super::reload::Reload;
use super::supervisor::{Command, Mailbox};
use super::worker::{WorkerId, WorkerInfo, WorkerState};
use crate::error::PoolError;
use crate::events::{Bus, Event};
use crate::routing::{RequestMeta, RequestRouter, RouteTarget};

/// Handle to a running worker pool.
#[derive(Clone)]
pub struct Pool {
    inner: Arc<Inner>,
}

struct Inner {
    mailbox: Mailbox,
    bus: Bus,
    desired: usize,
}

impl Drop for Inner {
    fn drop(&mut self) {
        let _ = self.mailbox.command(Command::Shutdown {
            hard: false,
            reply: None,
        });
    }
}

impl Pool {
    pub(crate) fn new(mailbox: Mailbox, bus: Bus, desired: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                mailbox,
                bus,
                desired,
            }),
        }
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, PoolError> {
        let (tx, rx) = oneshot::channel();
        self.inner.mailbox.command(make(tx))?;
        rx.await.map_err(|_| PoolError::Closed)
    }

    /// Picks a worker for a request, waiting for the first one to spawn if
    /// none is ready yet.
    pub async fn route(&self, meta: &RequestMeta) -> Result<RouteTarget, PoolError> {
        let meta = meta.clone();
        self.request(|reply| Command::Route { meta, reply })
            .await?
    }

    /// Replaces every worker with a fresh cohort.
    ///
    /// Resolves once the new cohort serves traffic ([`Reload::Completed`]), or
    /// immediately with [`Reload::Ignored`] if a reload is already running.
    pub async fn reload(&self) -> Result<Reload, PoolError> {
        self.request(|reply| Command::Reload { reply }).await?
    }

    /// Graceful shutdown: spawned workers get `die(worker_timeout)`, spawning
    /// ones are killed. Resolves when every worker has exited.
    pub async fn shutdown(&self) -> Result<(), PoolError> {
        self.request(|reply| Command::Shutdown {
            hard: false,
            reply: Some(reply),
        })
        .await
    }

    /// Kills every worker without grace. Resolves when all have exited.
    pub async fn hard_exit(&self) -> Result<(), PoolError> {
        self.request(|reply| Command::Shutdown {
            hard: true,
            reply: Some(reply),
        })
        .await
    }

    /// Asks a worker that is still spawning to report readiness now.
    ///
    /// Returns `false` if the worker is unknown or past `spawning`.
    pub async fn ready(&self, id: WorkerId) -> Result<bool, PoolError> {
        self.request(|reply| Command::Ready { id, reply }).await
    }

    /// Snapshot of every tracked worker, ordered by id.
    pub async fn workers(&self) -> Result<Vec<WorkerInfo>, PoolError> {
        self.request(|reply| Command::Workers { reply }).await
    }

    /// Number of spawned workers (those receiving traffic).
    pub async fn len(&self) -> Result<usize, PoolError> {
        let workers = self.workers().await?;
        Ok(workers
            .iter()
            .filter(|w| w.state == WorkerState::Spawned)
            .count())
    }

    /// Number of workers the pool keeps running.
    pub fn desired(&self) -> usize {
        self.inner.desired
    }

    /// Receiver for every event published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.inner.bus.subscribe()
    }
}

#[async_trait]
impl RequestRouter for Pool {
    async fn route(&self, meta: &RequestMeta) -> Result<RouteTarget, PoolError> {
        Pool::route(self, meta).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use tokio::sync::mpsc;
    use tokio::time;

    use super::*;
    use crate::channel::ControlMessage;
    use crate::core::{PoolBuilder, PoolConfig, WorkerCount};
    use crate::events::EventKind;
    use crate::policies::{BackoffPolicy, JitterPolicy};
    use crate::process::testing::{FakeChild, FakeLauncher};
    use crate::routing::sticky;

    struct Harness {
        pool: Pool,
        children: mpsc::UnboundedReceiver<FakeChild>,
        events: broadcast::Receiver<Event>,
        history: broadcast::Receiver<Event>,
        /// Makes further launches fail while set.
        fail: Arc<AtomicBool>,
    }

    impl Harness {
        fn start(cfg: PoolConfig) -> Self {
            Self::launch(cfg, false)
        }

        /// Pool whose launcher fails from the very first launch.
        fn start_failing(cfg: PoolConfig) -> Self {
            Self::launch(cfg, true)
        }

        fn launch(cfg: PoolConfig, failing: bool) -> Self {
            let (launcher, children) = FakeLauncher::new();
            let fail = launcher.fail_switch();
            fail.store(failing, Ordering::SeqCst);
            let pool = PoolBuilder::new("app", cfg)
                .with_launcher(launcher)
                .build()
                .expect("pool starts");
            let events = pool.subscribe();
            let history = pool.subscribe();
            Self {
                pool,
                children,
                events,
                history,
                fail,
            }
        }

        async fn child(&mut self) -> FakeChild {
            self.children.recv().await.expect("worker launched")
        }

        /// Next launched child, brought to `spawned` on `port`.
        async fn spawned(&mut self, port: u16) -> FakeChild {
            let mut child = self.child().await;
            child.listen_on(port).await;
            self.wait_for(EventKind::WorkerSpawned).await;
            child
        }

        async fn wait_for(&mut self, kind: EventKind) -> Event {
            loop {
                let ev = self.events.recv().await.expect("bus open");
                if ev.kind == kind {
                    return ev;
                }
            }
        }

        /// Every event published since the pool started.
        fn drain(&mut self) -> Vec<Event> {
            let mut out = Vec::new();
            while let Ok(ev) = self.history.try_recv() {
                out.push(ev);
            }
            out
        }

        async fn port(&self, path: &str) -> u16 {
            let target = self
                .pool
                .route(&RequestMeta::with_path(path))
                .await
                .expect("routed");
            target.addr.port()
        }
    }

    fn cfg(workers: usize) -> PoolConfig {
        PoolConfig {
            workers: WorkerCount::Fixed(workers),
            worker_timeout: Duration::from_secs(30),
            ..PoolConfig::default()
        }
    }

    fn count(events: &[Event], kind: EventKind) -> usize {
        events.iter().filter(|ev| ev.kind == kind).count()
    }

    fn backoff(max_attempts: u32) -> Option<BackoffPolicy> {
        Some(BackoffPolicy {
            first: Duration::from_millis(10),
            max: Duration::from_millis(50),
            factor: 2.0,
            jitter: JitterPolicy::None,
            max_attempts: Some(max_attempts),
        })
    }

    async fn settle() {
        time::sleep(Duration::from_millis(5)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_round_robin_over_spawned_workers() {
        let mut h = Harness::start(cfg(2));
        let _a = h.spawned(4001).await;
        let _b = h.spawned(4002).await;

        let mut ports = Vec::new();
        for _ in 0..4 {
            ports.push(h.port("/").await);
        }
        assert_eq!(ports, vec![4001, 4002, 4001, 4002]);
        assert_eq!(h.pool.len().await.unwrap(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_route_waits_for_first_spawn() {
        let mut h = Harness::start(cfg(1));
        let mut child = h.child().await;

        let pool = h.pool.clone();
        let waiting =
            tokio::spawn(async move { pool.route(&RequestMeta::with_path("/")).await });
        settle().await;
        assert!(!waiting.is_finished());

        child.listen_on(4001).await;
        let target = waiting.await.unwrap().unwrap();
        assert_eq!(target.addr.port(), 4001);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sticky_sessions_pin_to_one_worker() {
        let mut h = Harness::start(cfg(3));
        let ports = [4001, 4002, 4003];
        let mut children = Vec::new();
        for port in ports {
            children.push(h.spawned(port).await);
        }

        for id in ["abc", "Zk9_-q", "x"] {
            let path = format!("/socket.io/1/xhr-polling/{id}");
            let expected = ports[sticky::bucket(id, 3)];
            for _ in 0..3 {
                assert_eq!(h.port(&path).await, expected);
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_graceful_reload_swaps_cohorts() {
        let mut h = Harness::start(cfg(2));
        let mut old_a = h.spawned(4001).await;
        let mut old_b = h.spawned(4002).await;

        let pool = h.pool.clone();
        let reload = tokio::spawn(async move { pool.reload().await });
        let mut new_a = h.child().await;
        let mut new_b = h.child().await;

        // Old workers keep serving until the whole cohort is up.
        assert!([4001, 4002].contains(&h.port("/").await));

        new_a.listen_on(5001).await;
        new_b.listen_on(5002).await;
        assert_eq!(reload.await.unwrap(), Ok(Reload::Completed));

        let die = ControlMessage::die(Duration::from_secs(30));
        assert_eq!(old_a.recv().await, Some(die.clone()));
        assert_eq!(old_b.recv().await, Some(die));

        for _ in 0..4 {
            assert!([5001, 5002].contains(&h.port("/").await));
        }

        old_a.exit(0);
        old_b.exit(0);
        settle().await;
        let workers = h.pool.workers().await.unwrap();
        assert_eq!(workers.len(), 2);
        assert!(workers.iter().all(|w| w.state == WorkerState::Spawned));
        assert_eq!(count(&h.drain(), EventKind::ReloadCompleted), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disruptive_reload_drains_first() {
        let mut h = Harness::start(PoolConfig {
            worker_timeout: Duration::ZERO,
            ..cfg(2)
        });
        let mut old_a = h.spawned(4001).await;
        let mut old_b = h.spawned(4002).await;

        let pool = h.pool.clone();
        let reload = tokio::spawn(async move { pool.reload().await });

        let die = ControlMessage::die(Duration::ZERO);
        assert_eq!(old_a.recv().await, Some(die.clone()));
        assert_eq!(old_b.recv().await, Some(die));

        old_a.exit(0);
        settle().await;
        assert!(h.children.try_recv().is_err());

        old_b.exit(0);
        let mut new_a = h.child().await;
        let mut new_b = h.child().await;
        new_a.listen_on(5001).await;
        new_b.listen_on(5002).await;
        assert_eq!(reload.await.unwrap(), Ok(Reload::Completed));
        assert!([5001, 5002].contains(&h.port("/").await));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reload_in_flight_is_ignored() {
        let mut h = Harness::start(cfg(1));
        let _old = h.spawned(4001).await;

        let pool = h.pool.clone();
        let first = tokio::spawn(async move { pool.reload().await });
        let mut fresh = h.child().await;

        assert_eq!(h.pool.reload().await, Ok(Reload::Ignored));
        settle().await;
        assert!(h.children.try_recv().is_err());

        fresh.listen_on(5001).await;
        assert_eq!(first.await.unwrap(), Ok(Reload::Completed));
        assert_eq!(count(&h.drain(), EventKind::ReloadCompleted), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reload_fails_when_cohort_member_exits() {
        let mut h = Harness::start(cfg(1));
        let mut old = h.spawned(4001).await;

        let pool = h.pool.clone();
        let reload = tokio::spawn(async move { pool.reload().await });
        let mut fresh = h.child().await;
        fresh.exit(1);

        let res = reload.await.unwrap();
        assert!(matches!(res, Err(PoolError::ReloadFailed { .. })));
        assert_eq!(h.port("/").await, 4001);
        assert!(
            time::timeout(Duration::from_secs(1), old.recv())
                .await
                .is_err(),
            "old worker must not be told to die"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_young_crash_is_not_respawned() {
        let mut h = Harness::start(PoolConfig {
            keep_alive: true,
            min_expected_lifetime: Duration::from_secs(1),
            ..cfg(1)
        });
        let mut child = h.spawned(4001).await;
        time::sleep(Duration::from_millis(100)).await;
        child.exit(1);

        let ev = h.wait_for(EventKind::RespawnSuppressed).await;
        assert_eq!(ev.pid, Some(child.pid));
        time::sleep(Duration::from_secs(5)).await;
        assert!(h.children.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_mature_crash_is_respawned_once() {
        let mut h = Harness::start(PoolConfig {
            keep_alive: true,
            min_expected_lifetime: Duration::from_secs(1),
            ..cfg(1)
        });
        let mut child = h.spawned(4001).await;
        time::sleep(Duration::from_secs(2)).await;
        child.exit(1);

        h.wait_for(EventKind::Respawn).await;
        let _replacement = h.spawned(4002).await;
        settle().await;
        assert!(h.children.try_recv().is_err());
        assert_eq!(h.port("/").await, 4002);
    }

    #[tokio::test(start_paused = true)]
    async fn test_crash_without_keep_alive_is_left_alone() {
        let mut h = Harness::start(cfg(1));
        let mut child = h.spawned(4001).await;
        child.exit(1);

        let ev = h.wait_for(EventKind::WorkerTerminated).await;
        assert_eq!(ev.reason.as_deref(), Some("unexpected"));
        time::sleep(Duration::from_secs(5)).await;
        assert!(h.children.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_gives_up_after_max_attempts() {
        let mut h = Harness::start(PoolConfig {
            keep_alive: true,
            backoff: Some(BackoffPolicy {
                first: Duration::from_millis(100),
                max: Duration::from_secs(1),
                factor: 2.0,
                jitter: JitterPolicy::None,
                max_attempts: Some(3),
            }),
            ..cfg(1)
        });
        let mut child = h.spawned(4001).await;
        child.exit(1);

        for _ in 0..3 {
            let mut candidate = h.child().await;
            candidate.exit(1);
        }
        let ev = h.wait_for(EventKind::RespawnExhausted).await;
        assert_eq!(ev.attempt, Some(3));

        time::sleep(Duration::from_secs(60)).await;
        assert!(h.children.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_delays_grow() {
        let mut h = Harness::start(PoolConfig {
            keep_alive: true,
            backoff: Some(BackoffPolicy {
                first: Duration::from_millis(100),
                max: Duration::from_secs(1),
                factor: 2.0,
                jitter: JitterPolicy::None,
                max_attempts: Some(2),
            }),
            ..cfg(1)
        });
        let mut child = h.spawned(4001).await;
        child.exit(1);

        for _ in 0..2 {
            let mut candidate = h.child().await;
            candidate.exit(1);
        }
        h.wait_for(EventKind::RespawnExhausted).await;

        let delays: Vec<Option<u32>> = h
            .drain()
            .into_iter()
            .filter(|ev| ev.kind == EventKind::BackoffScheduled)
            .map(|ev| ev.delay_ms)
            .collect();
        assert_eq!(delays, vec![Some(100), Some(200)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_startup_watchdog_reports_slow_worker() {
        let mut h = Harness::start(PoolConfig {
            min_expected_lifetime: Duration::from_secs(1),
            ..cfg(1)
        });
        let child = h.child().await;

        let ev = h.wait_for(EventKind::UnsuccessfulStartup).await;
        assert_eq!(ev.pid, Some(child.pid));
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminating_worker_is_killed_after_grace() {
        let mut h = Harness::start(PoolConfig {
            worker_timeout: Duration::from_secs(1),
            kill_slack: Duration::from_secs(1),
            ..cfg(1)
        });
        let mut child = h.spawned(4001).await;

        let pool = h.pool.clone();
        let shutdown = tokio::spawn(async move { pool.shutdown().await });
        assert_eq!(
            child.recv().await,
            Some(ControlMessage::die(Duration::from_secs(1)))
        );

        h.wait_for(EventKind::GraceExceeded).await;
        h.wait_for(EventKind::AllStopped).await;
        assert_eq!(shutdown.await.unwrap(), Ok(()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_graceful_shutdown_waits_for_exit() {
        let mut h = Harness::start(cfg(1));
        let mut child = h.spawned(4001).await;

        let pool = h.pool.clone();
        let shutdown = tokio::spawn(async move { pool.shutdown().await });
        assert!(child.recv().await.is_some());
        settle().await;
        assert!(!shutdown.is_finished());

        child.exit(0);
        assert_eq!(shutdown.await.unwrap(), Ok(()));
        assert_eq!(
            h.pool.route(&RequestMeta::default()).await,
            Err(PoolError::Closed)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_hard_exit_kills_everything() {
        let mut h = Harness::start(cfg(2));
        let _spawned = h.spawned(4001).await;
        let _spawning = h.child().await;

        assert_eq!(h.pool.hard_exit().await, Ok(()));
        let events = h.drain();
        assert_eq!(count(&events, EventKind::WorkerTerminated), 2);
        assert_eq!(count(&events, EventKind::AllStopped), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_fails_deferred_routes() {
        let mut h = Harness::start(cfg(1));
        let _spawning = h.child().await;

        let pool = h.pool.clone();
        let waiting =
            tokio::spawn(async move { pool.route(&RequestMeta::default()).await });
        settle().await;

        assert_eq!(h.pool.hard_exit().await, Ok(()));
        assert_eq!(waiting.await.unwrap(), Err(PoolError::Closed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_is_sent_to_spawning_worker() {
        let mut h = Harness::start(cfg(1));
        let mut child = h.child().await;

        let workers = h.pool.workers().await.unwrap();
        let id = workers[0].id;
        assert_eq!(workers[0].state, WorkerState::Spawning);
        assert_eq!(h.pool.ready(id).await, Ok(true));
        assert_eq!(child.recv().await, Some(ControlMessage::Ready));

        child.listen_on(4001).await;
        h.wait_for(EventKind::WorkerSpawned).await;
        assert_eq!(h.pool.ready(id).await, Ok(false));
    }

    #[tokio::test(start_paused = true)]
    async fn test_young_crash_enters_backoff_when_configured() {
        let mut h = Harness::start(PoolConfig {
            keep_alive: true,
            min_expected_lifetime: Duration::from_millis(100),
            backoff: backoff(3),
            ..cfg(1)
        });
        let mut original = h.spawned(4001).await;
        original.exit(1);

        for port in 5001..5004 {
            let mut candidate = h.spawned(port).await;
            candidate.exit(1);
        }
        let ev = h.wait_for(EventKind::RespawnExhausted).await;
        assert_eq!(ev.attempt, Some(3));

        time::sleep(Duration::from_secs(1)).await;
        assert!(h.children.try_recv().is_err());
        let events = h.drain();
        assert_eq!(count(&events, EventKind::Respawn), 3);
        assert_eq!(count(&events, EventKind::RespawnSuppressed), 0);
        assert!(
            events
                .iter()
                .any(|ev| ev.kind == EventKind::UnsuccessfulStartup && ev.pid == Some(original.pid))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_bind_then_crash_still_exhausts_backoff() {
        let mut h = Harness::start(PoolConfig {
            keep_alive: true,
            backoff: backoff(3),
            ..cfg(1)
        });
        let mut original = h.spawned(4001).await;
        original.exit(1);

        for port in 5001..5004 {
            let mut candidate = h.spawned(port).await;
            candidate.exit(1);
        }
        let ev = h.wait_for(EventKind::RespawnExhausted).await;
        assert_eq!(ev.attempt, Some(3));

        time::sleep(Duration::from_secs(1)).await;
        assert!(h.children.try_recv().is_err());
        let events = h.drain();
        assert_eq!(count(&events, EventKind::Respawn), 3);
        assert_eq!(count(&events, EventKind::UnsuccessfulStartup), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_proven_candidate_starts_a_new_sequence() {
        let mut h = Harness::start(PoolConfig {
            keep_alive: true,
            backoff: backoff(3),
            ..cfg(1)
        });
        let mut original = h.spawned(4001).await;
        original.exit(1);

        let mut failed = h.spawned(5001).await;
        failed.exit(1);
        let mut healthy = h.spawned(5002).await;
        time::sleep(Duration::from_millis(50)).await;
        healthy.exit(1);
        let _next = h.child().await;

        let attempts: Vec<Option<u32>> = h
            .drain()
            .into_iter()
            .filter(|ev| ev.kind == EventKind::BackoffScheduled)
            .map(|ev| ev.attempt)
            .collect();
        assert_eq!(attempts, vec![Some(1), Some(2), Some(1)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_crash_during_failed_reload_is_replaced() {
        let mut h = Harness::start(PoolConfig {
            keep_alive: true,
            ..cfg(2)
        });
        let mut old_a = h.spawned(4001).await;
        let _old_b = h.spawned(4002).await;

        let pool = h.pool.clone();
        let reload = tokio::spawn(async move { pool.reload().await });
        let mut new_c = h.child().await;
        let _new_d = h.child().await;

        old_a.exit(1);
        settle().await;
        assert!(h.children.try_recv().is_err());

        new_c.exit(1);
        assert!(matches!(
            reload.await.unwrap(),
            Err(PoolError::ReloadFailed { .. })
        ));

        let _replacement = h.spawned(4003).await;
        assert_eq!(count(&h.drain(), EventKind::Respawn), 1);
        assert_eq!(h.pool.len().await.unwrap(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_launch_counts_as_attempt() {
        let mut h = Harness::start(PoolConfig {
            keep_alive: true,
            backoff: backoff(2),
            ..cfg(1)
        });
        let mut child = h.spawned(4001).await;
        h.fail.store(true, Ordering::SeqCst);
        child.exit(1);

        let ev = h.wait_for(EventKind::RespawnExhausted).await;
        assert_eq!(ev.attempt, Some(2));
        let events = h.drain();
        assert_eq!(count(&events, EventKind::LaunchFailed), 2);
        assert_eq!(count(&events, EventKind::Respawn), 0);
        assert!(h.children.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cohort_launch_failure_fails_reload() {
        let mut h = Harness::start(cfg(1));
        let _old = h.spawned(4001).await;
        h.fail.store(true, Ordering::SeqCst);

        assert!(matches!(
            h.pool.reload().await,
            Err(PoolError::ReloadFailed { .. })
        ));
        assert_eq!(h.port("/").await, 4001);

        let events = h.drain();
        assert_eq!(count(&events, EventKind::LaunchFailed), 1);
        assert_eq!(count(&events, EventKind::ReloadFailed), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_launch_failures_are_reported() {
        let mut h = Harness::start_failing(cfg(2));
        settle().await;

        assert!(h.pool.workers().await.unwrap().is_empty());
        let events = h.drain();
        assert_eq!(count(&events, EventKind::LaunchFailed), 2);
        assert!(events.iter().all(|ev| ev.kind != EventKind::WorkerLaunched));
    }

    #[tokio::test(start_paused = true)]
    async fn test_startup_watchdog_reports_early_exit() {
        let mut h = Harness::start(PoolConfig {
            min_expected_lifetime: Duration::from_secs(1),
            ..cfg(1)
        });
        let mut child = h.child().await;
        time::sleep(Duration::from_millis(100)).await;
        child.exit(1);

        let ev = h.wait_for(EventKind::UnsuccessfulStartup).await;
        assert_eq!(ev.pid, Some(child.pid));
    }

    #[tokio::test(start_paused = true)]
    async fn test_disruptive_reload_failure_keeps_survivors() {
        let mut h = Harness::start(PoolConfig {
            worker_timeout: Duration::ZERO,
            ..cfg(2)
        });
        let mut old_a = h.spawned(4001).await;
        let mut old_b = h.spawned(4002).await;

        let pool = h.pool.clone();
        let reload = tokio::spawn(async move { pool.reload().await });
        assert!(old_a.recv().await.is_some());
        assert!(old_b.recv().await.is_some());
        old_a.exit(0);
        old_b.exit(0);

        let mut new_a = h.spawned(5001).await;
        let mut new_b = h.child().await;
        new_b.exit(1);
        assert!(matches!(
            reload.await.unwrap(),
            Err(PoolError::ReloadFailed { .. })
        ));

        assert_eq!(h.port("/").await, 5001);
        assert_eq!(h.port("/").await, 5001);
        let workers = h.pool.workers().await.unwrap();
        assert_eq!(workers.len(), 1);
        assert_eq!(workers[0].state, WorkerState::Spawned);
        assert!(
            time::timeout(Duration::from_secs(1), new_a.recv())
                .await
                .is_err(),
            "survivor must keep serving"
        );
    }
}
