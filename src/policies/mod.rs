//! Respawn backoff policies.
//!
//! This module groups the knobs that control **how long** the pool waits
//! between respawn attempts of a crash-looping worker and **how many** attempts
//! it makes before giving up.
//!
//! ## Contents
//! - [`BackoffPolicy`] how retry delays evolve (first / factor / max + jitter) and the attempt ceiling
//! - [`JitterPolicy`]  randomization strategy to avoid synchronized respawns
//!
//! ## Quick wiring
//! ```text
//! PoolConfig { keep_alive, min_expected_lifetime, backoff: Option<BackoffPolicy>, .. }
//!      └─► core::respawn::RespawnSequence uses:
//!           - backoff.next(attempt) to schedule the next respawn
//!           - backoff.is_exhausted(attempts) to stop and report `RespawnExhausted`
//! ```
//!
//! ## Defaults
//! - `PoolConfig::backoff = None` → a qualifying crash is replaced immediately.
//! - `BackoffPolicy::default()` → first=100ms, factor=2.0, max=30s, unlimited attempts, jitter=None.

mod backoff;
mod jitter;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
