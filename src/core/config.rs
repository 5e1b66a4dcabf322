//! # Pool configuration.
//!
//! [`PoolConfig`] holds every knob of a pool. Fields are public; the helper
//! accessors interpret sentinel values so the supervisor does not sprinkle
//! `== 0` checks around.
//!
//! ## Sentinel values
//! - `worker_timeout = 0s` → reloads take the disruptive path (stop all, then start)
//! - `min_expected_lifetime = 0s` → no crash-loop gate, no startup watchdog
//! - `backoff = None` → crashed workers are replaced immediately
//! - `ping_interval = None` or `0s` → workers send no heartbeat

use std::time::Duration;

use crate::policies::BackoffPolicy;
use crate::worker::Bootstrap;

/// How many workers the pool keeps running.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkerCount {
    /// Exactly `n` workers.
    Fixed(usize),
    /// `factor` workers per logical CPU.
    PerCpu(usize),
}

impl WorkerCount {
    /// Resolves to a concrete number (at least 1).
    pub fn resolve(self) -> usize {
        let n = match self {
            WorkerCount::Fixed(n) => n,
            WorkerCount::PerCpu(factor) => num_cpus::get().saturating_mul(factor),
        };
        n.max(1)
    }
}

impl Default for WorkerCount {
    fn default() -> Self {
        WorkerCount::PerCpu(1)
    }
}

/// Configuration of a worker pool.
///
/// ## Field semantics
/// - `workers`: desired number of workers (resolved once at build time)
/// - `worker_timeout`: grace period given to a worker asked to exit
/// - `kill_slack`: extra time after `worker_timeout` before a terminating worker is killed
/// - `requires`: preload hooks every worker runs before loading the payload
/// - `assume_ready`: workers report their address as soon as they are bound
/// - `keep_alive`: replace workers that crash
/// - `min_expected_lifetime`: workers dying younger than this are not replaced
///   (with `backoff` set they are, and count as failed attempts)
/// - `backoff`: delay policy between respawn attempts
/// - `ping_interval`: worker heartbeat period
/// - `title`: process title prefix (`"<title> worker"`)
/// - `bus_capacity`: notification ring buffer size (min 1)
#[derive(Clone, Debug)]
pub struct PoolConfig {
    /// Desired number of workers.
    pub workers: WorkerCount,

    /// Grace period sent with `die`.
    ///
    /// `Duration::ZERO` selects the disruptive reload path.
    pub worker_timeout: Duration,

    /// Extra time after `worker_timeout` before the supervisor kills a
    /// terminating worker that is still alive.
    pub kill_slack: Duration,

    /// Preload hooks, in order.
    pub requires: Vec<String>,

    /// Report `addr` right after bind (otherwise the payload signals readiness).
    pub assume_ready: bool,

    /// Replace crashed workers.
    pub keep_alive: bool,

    /// Minimum age for a crashed worker to be replaced.
    pub min_expected_lifetime: Duration,

    /// Respawn delay policy (`None` = immediate, unbounded).
    pub backoff: Option<BackoffPolicy>,

    /// Worker heartbeat period.
    pub ping_interval: Option<Duration>,

    /// Process title prefix.
    pub title: Option<String>,

    /// Capacity of the notification bus.
    pub bus_capacity: usize,
}

impl PoolConfig {
    /// `true` when reloads stop the old cohort before starting the new one.
    #[inline]
    pub fn is_disruptive_reload(&self) -> bool {
        self.worker_timeout.is_zero()
    }

    /// Minimum expected lifetime as an `Option` (`None` when zero).
    #[inline]
    pub fn min_lifetime(&self) -> Option<Duration> {
        if self.min_expected_lifetime.is_zero() {
            None
        } else {
            Some(self.min_expected_lifetime)
        }
    }

    /// How long a terminating worker may live before it is killed.
    #[inline]
    pub fn kill_after(&self) -> Duration {
        self.worker_timeout.saturating_add(self.kill_slack)
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Startup contract handed to every worker running `payload`.
    pub fn bootstrap(&self, payload: &str) -> Bootstrap {
        let mut boot = Bootstrap::new(payload);
        boot.requires = self.requires.clone();
        boot.assume_ready = self.assume_ready;
        boot.title = self.title.clone();
        boot.ping_interval_ms = self
            .ping_interval
            .filter(|d| !d.is_zero())
            .map(|d| d.as_millis().min(u128::from(u64::MAX)) as u64);
        boot
    }
}

impl Default for PoolConfig {
    /// Default configuration:
    ///
    /// - one worker per CPU
    /// - `worker_timeout = 10min`, `kill_slack = 5s`
    /// - `assume_ready = true`, `keep_alive = false`
    /// - no lifetime gate, no backoff, no heartbeat, no title
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            workers: WorkerCount::default(),
            worker_timeout: Duration::from_secs(10 * 60),
            kill_slack: Duration::from_secs(5),
            requires: Vec::new(),
            assume_ready: true,
            keep_alive: false,
            min_expected_lifetime: Duration::ZERO,
            backoff: None,
            ping_interval: None,
            title: None,
            bus_capacity: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = PoolConfig::default();
        assert_eq!(cfg.worker_timeout, Duration::from_secs(600));
        assert!(!cfg.is_disruptive_reload());
        assert_eq!(cfg.min_lifetime(), None);
        assert_eq!(cfg.kill_after(), Duration::from_secs(605));
        assert!(cfg.assume_ready);
        assert!(!cfg.keep_alive);
    }

    #[test]
    fn test_worker_count_resolution() {
        assert_eq!(WorkerCount::Fixed(3).resolve(), 3);
        assert_eq!(WorkerCount::Fixed(0).resolve(), 1);
        assert_eq!(WorkerCount::PerCpu(2).resolve(), num_cpus::get() * 2);
    }

    #[test]
    fn test_bootstrap_carries_worker_settings() {
        let cfg = PoolConfig {
            requires: vec!["env".into()],
            assume_ready: false,
            title: Some("hello".into()),
            ping_interval: Some(Duration::from_secs(2)),
            ..PoolConfig::default()
        };
        let boot = cfg.bootstrap("app");
        assert_eq!(boot.payload, "app");
        assert_eq!(boot.requires, vec!["env".to_string()]);
        assert!(!boot.assume_ready);
        assert_eq!(boot.process_title().as_deref(), Some("hello worker"));
        assert_eq!(boot.ping_interval_ms, Some(2000));
    }
}
