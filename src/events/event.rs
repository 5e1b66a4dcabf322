//! # Notifications emitted by the pool supervisor.
//!
//! The [`EventKind`] enum classifies notifications across four categories:
//! - **Worker lifecycle**: launched, spawned (ready), terminating, terminated
//! - **Recovery**: respawn attempts, suppression, backoff, exhaustion, failed startups
//! - **Pool operations**: reload completion/failure, shutdown, grace overrun
//! - **Subscriber health**: overflow and panics inside subscribers
//!
//! The [`Event`] struct carries metadata such as the worker id and pid, the
//! listen address, exit reason, attempt numbers and delays.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Events about one worker are published in the order the
//! supervisor observed them; across workers there is no ordering beyond `seq`.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use poolvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::BackoffScheduled)
//!     .with_attempt(3)
//!     .with_delay(Duration::from_millis(800));
//!
//! assert_eq!(ev.kind, EventKind::BackoffScheduled);
//! assert_eq!(ev.delay_ms, Some(800));
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::core::WorkerId;
use crate::process::ExitReason;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of pool notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Worker lifecycle ===
    /// A child process was started (state `spawning`).
    ///
    /// Sets: `worker`, `pid`
    WorkerLaunched,

    /// Starting a child process failed; no worker was created.
    ///
    /// Sets: `reason`
    LaunchFailed,

    /// Worker reported its listen address and joined the rotation.
    ///
    /// Sets: `worker`, `pid`, `addr`
    WorkerSpawned,

    /// Worker was asked to exit after a grace period.
    ///
    /// Sets: `worker`, `pid`, `timeout_ms`
    WorkerTerminating,

    /// Worker process is gone.
    ///
    /// Sets: `worker`, `pid`, `exit`, `reason` (`"unexpected"` for crashes)
    WorkerTerminated,

    // === Recovery ===
    /// A worker did not reach `spawned` within the minimum expected lifetime.
    ///
    /// Sets: `worker`, `pid`
    UnsuccessfulStartup,

    /// A crashed worker is not replaced because it died younger than the
    /// minimum expected lifetime.
    ///
    /// Sets: `worker`, `pid`, `reason`
    RespawnSuppressed,

    /// Next respawn attempt scheduled.
    ///
    /// Sets: `attempt` (1-based number of the upcoming attempt), `delay_ms`
    BackoffScheduled,

    /// A replacement worker is being started.
    ///
    /// Sets: `worker`, `pid`, `attempt` (absent when no backoff is configured)
    Respawn,

    /// Backoff attempts are used up; no more automatic respawns for this sequence.
    ///
    /// Sets: `attempt` (attempts made)
    RespawnExhausted,

    // === Pool operations ===
    /// The new cohort replaced the old one.
    ReloadCompleted,

    /// The new cohort could not be brought up; the reload was abandoned.
    ///
    /// Sets: `worker`, `reason`
    ReloadFailed,

    /// A terminating worker outlived its grace period and was killed.
    ///
    /// Sets: `worker`, `pid`, `timeout_ms`
    GraceExceeded,

    /// Shutdown (graceful or hard) started.
    ShutdownRequested,

    /// Every worker has exited after a shutdown.
    AllStopped,

    // === Subscriber health ===
    /// A subscriber panicked while handling an event.
    ///
    /// Sets: `reason` (subscriber name and panic info)
    SubscriberPanicked,

    /// A subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `reason`
    SubscriberOverflow,
}

/// Notification with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Worker the event is about.
    pub worker: Option<WorkerId>,
    /// OS process id of that worker.
    pub pid: Option<u32>,
    /// Worker listen address.
    pub addr: Option<SocketAddr>,
    /// How the worker process ended.
    pub exit: Option<ExitReason>,
    /// Attempt counter (respawn sequences).
    pub attempt: Option<u32>,
    /// Delay before the next attempt in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Grace period in milliseconds (compact).
    pub timeout_ms: Option<u32>,
    /// Human-readable reason.
    pub reason: Option<Arc<str>>,
}

fn compact_ms(d: Duration) -> u32 {
    d.as_millis().min(u128::from(u32::MAX)) as u32
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            worker: None,
            pid: None,
            addr: None,
            exit: None,
            attempt: None,
            delay_ms: None,
            timeout_ms: None,
            reason: None,
        }
    }

    /// Attaches worker identity.
    #[inline]
    pub fn with_worker(mut self, id: WorkerId, pid: u32) -> Self {
        self.worker = Some(id);
        self.pid = Some(pid);
        self
    }

    /// Attaches a listen address.
    #[inline]
    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = Some(addr);
        self
    }

    /// Attaches an exit reason.
    #[inline]
    pub fn with_exit(mut self, exit: ExitReason) -> Self {
        self.exit = Some(exit);
        self
    }

    /// Attaches an attempt count.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a backoff delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        self.delay_ms = Some(compact_ms(d));
        self
    }

    /// Attaches a grace period (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        self.timeout_ms = Some(compact_ms(d));
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_reason(format!("subscriber={subscriber} info={info}"))
    }

    /// `true` for subscriber health events (never re-fanned to subscribers).
    #[inline]
    pub fn is_subscriber_health(&self) -> bool {
        matches!(
            self.kind,
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked
        )
    }
}
