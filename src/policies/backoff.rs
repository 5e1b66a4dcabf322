//! # Backoff policy for respawning crash-looping workers.
//!
//! [`BackoffPolicy`] controls how respawn delays grow after repeated failures.
//! It is parameterized by:
//! - [`BackoffPolicy::first`] the initial delay;
//! - [`BackoffPolicy::max`] the maximum delay cap;
//! - [`BackoffPolicy::factor`] the multiplicative growth factor (`2.0` by default);
//! - [`BackoffPolicy::max_attempts`] the attempt ceiling (`None` = unlimited).
//!
//! The delay for attempt `n` is computed as `first × factor^n`, clamped to `max`,
//! then jitter is applied. The base delay is derived purely from the attempt
//! number, so jitter output never feeds back into later calculations.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use poolvisor::{BackoffPolicy, JitterPolicy};
//!
//! let backoff = BackoffPolicy {
//!     first: Duration::from_millis(100),
//!     max: Duration::from_secs(10),
//!     factor: 2.0,
//!     jitter: JitterPolicy::None,
//!     max_attempts: Some(5),
//! };
//!
//! // Attempt 0 uses 'first' (100ms), clamped to max
//! assert_eq!(backoff.next(0), Duration::from_millis(100));
//!
//! // Attempt 1 = first × factor^1 = 200ms
//! assert_eq!(backoff.next(1), Duration::from_millis(200));
//!
//! // Attempt 10 = 100ms × 2^10 = 102_400ms → capped at max=10s
//! assert_eq!(backoff.next(10), Duration::from_secs(10));
//!
//! assert!(!backoff.is_exhausted(4));
//! assert!(backoff.is_exhausted(5));
//! ```

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Respawn backoff policy.
#[derive(Clone, Copy, Debug)]
pub struct BackoffPolicy {
    /// Delay before the first respawn attempt.
    pub first: Duration,
    /// Maximum delay cap.
    pub max: Duration,
    /// Multiplicative growth factor (`>= 1.0` recommended).
    pub factor: f64,
    /// Jitter policy to spread respawns of many pools sharing a host.
    pub jitter: JitterPolicy,
    /// Number of consecutive unsuccessful respawns tolerated (`None` = unlimited).
    pub max_attempts: Option<u32>,
}

impl Default for BackoffPolicy {
    /// Returns a strategy with:
    /// - `first = 100ms`;
    /// - `max = 30s`;
    /// - `factor = 2.0` (doubling);
    /// - unlimited attempts, no jitter.
    fn default() -> Self {
        Self {
            first: Duration::from_millis(100),
            max: Duration::from_secs(30),
            factor: 2.0,
            jitter: JitterPolicy::None,
            max_attempts: None,
        }
    }
}

impl BackoffPolicy {
    /// Delay before respawn attempt `attempt` (0 = first retry after a crash).
    ///
    /// The ladder is `first × factor^attempt` capped at [`BackoffPolicy::max`];
    /// jitter is applied to the capped value.
    pub fn next(&self, attempt: u32) -> Duration {
        let base = self.ladder(attempt);
        match self.jitter {
            JitterPolicy::Decorrelated => {
                self.jitter
                    .apply_decorrelated(self.first.min(self.max), base, self.max)
            }
            jitter => jitter.apply(base),
        }
    }

    /// Returns `true` once `attempts` unsuccessful respawns reach the ceiling.
    #[inline]
    pub fn is_exhausted(&self, attempts: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempts >= max)
    }

    /// Un-jittered delay; overflow and negative factors collapse to `max`.
    fn ladder(&self, attempt: u32) -> Duration {
        let exp = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.first.as_secs_f64() * self.factor.powi(exp);
        if secs.is_finite() && (0.0..=self.max.as_secs_f64()).contains(&secs) {
            Duration::from_secs_f64(secs)
        } else {
            self.max
        }
    }
}
