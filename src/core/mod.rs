//! Pool core: supervisor actor, worker lifecycle, reload and respawn.
//!
//! The public surface is [`Pool`] (built with [`PoolBuilder`] from a
//! [`PoolConfig`]) plus the types it hands out. Internals:
//! - `supervisor`: the actor owning all pool state, crash rule, routing, shutdown;
//! - `worker`: per-worker state machine and the tasks serving its pipes;
//! - `reload`: graceful and disruptive cohort replacement;
//! - `respawn`: backoff-driven replacement of crashed workers;
//! - `shutdown`: OS signal helpers.

mod builder;
mod config;
mod pool;
mod reload;
mod respawn;
mod shutdown;
mod supervisor;
mod worker;


pub use builder::PoolBuilder;
pub use config::{PoolConfig, WorkerCount};
pub use pool::Pool;
pub use reload::Reload;
pub use shutdown::{wait_for_reload_signal, wait_for_shutdown_signal};
pub use worker::{WorkerId, WorkerInfo, WorkerState};
