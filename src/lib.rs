//! # poolvisor
//!
//! **Poolvisor** supervises a pool of worker processes behind one front door.
//!
//! Each worker is an independent OS process running a registered
//! [`Payload`] (a listener-producing server). The supervisor keeps the
//! desired number alive, replaces the whole cohort on [`Pool::reload`]
//! without dropping traffic, and picks a worker for every inbound request.
//! It does not accept connections itself; a front door calls
//! [`Pool::route`] and forwards the connection to the returned address.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   front door ──route/reload/shutdown──► Pool (handle)
//!                                            │ Command
//!                                            ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Supervisor actor (single task, owns all pool state)              │
//! │  - workers: spawning / spawned / terminating                      │
//! │  - rotation + RoutingPolicy (round-robin, sticky sessions)        │
//! │  - reload round, respawn sequence (BackoffPolicy)                 │
//! └──────┬──────────────────┬──────────────────┬───────────────┬──────┘
//!        │ Launch           │                  │               │ publish
//!        ▼                  ▼                  ▼               ▼
//!   ┌──────────┐       ┌──────────┐       ┌──────────┐   ┌─────────────┐
//!   │ worker 1 │       │ worker 2 │       │ worker N │   │     Bus     │
//!   │ process  │       │ process  │       │ process  │   └──────┬──────┘
//!   └────┬─────┘       └────┬─────┘       └────┬─────┘          ▼
//!        │ stdin/stdout control channel (JSON lines)      SubscriberSet
//!        │ addr / ready / die / ping                    ┌───────┼───────┐
//!        ▼                                              ▼       ▼       ▼
//!   run_worker: bind ─► serve payload ─► heartbeat   sub1    sub2    subN
//! ```
//!
//! ### Worker lifecycle
//! ```text
//! spawning ──addr──► spawned ──die(grace)──► terminating ──exit──► terminated
//!     │                                          │
//!     └────────────── exit / kill ───────────────┴──────────────► terminated
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                       |
//! |-------------------|--------------------------------------------------------------|------------------------------------------|
//! | **Pool**          | Start, route, reload and stop a worker pool.                 | [`Pool`], [`PoolBuilder`], [`PoolConfig`] |
//! | **Workers**       | Worker-side runtime hosting a payload.                       | [`Payload`], [`WorkerRegistry`], [`run_worker_main`] |
//! | **Routing**       | Round-robin with socket.io session affinity.                 | [`RoutingPolicy`], [`RequestRouter`]     |
//! | **Policies**      | Respawn backoff for crash loops.                             | [`BackoffPolicy`], [`JitterPolicy`]      |
//! | **Subscriber API**| Hook into pool notifications.                                | [`Subscribe`], [`Event`]                 |
//! | **Errors**        | Typed errors for both sides of the control channel.          | [`PoolError`], [`WorkerError`]           |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] subscriber.
//!
//! ## Example
//! ```no_run
//! use poolvisor::{
//!     Payload, PayloadContext, PoolBuilder, PoolConfig, RequestMeta, WorkerCount,
//!     WorkerError, WorkerRegistry, run_worker_main,
//! };
//!
//! struct Hello;
//!
//! #[async_trait::async_trait]
//! impl Payload for Hello {
//!     async fn serve(
//!         &self,
//!         listener: tokio::net::TcpListener,
//!         ctx: PayloadContext,
//!     ) -> Result<(), WorkerError> {
//!         ctx.shutdown.cancelled().await;
//!         drop(listener);
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // The same binary is started again for every worker.
//!     if let Some(bootstrap) = poolvisor::Bootstrap::from_env()? {
//!         let registry = WorkerRegistry::new().payload("hello", Hello);
//!         std::process::exit(run_worker_main(bootstrap, &registry).await);
//!     }
//!
//!     let cfg = PoolConfig {
//!         workers: WorkerCount::Fixed(4),
//!         ..PoolConfig::default()
//!     };
//!     let pool = PoolBuilder::new("hello", cfg).build()?;
//!     let target = pool.route(&RequestMeta::with_path("/")).await?;
//!     println!("worker {} listens on {}", target.worker, target.addr);
//!
//!     pool.reload().await?;
//!     pool.shutdown().await?;
//!     Ok(())
//! }
//! ```
pub mod channel;
mod core;
mod error;
mod events;
pub mod logging;
mod policies;
pub mod process;
pub mod routing;
mod subscribers;
mod worker;

// ---- Public re-exports ----

pub use crate::core::{
    Pool, PoolBuilder, PoolConfig, Reload, WorkerCount, WorkerId, WorkerInfo, WorkerState,
    wait_for_reload_signal, wait_for_shutdown_signal,
};
pub use error::{ChannelError, PoolError, WorkerError};
pub use events::{Bus, Event, EventKind};
pub use policies::{BackoffPolicy, JitterPolicy};
pub use routing::{RequestMeta, RequestRouter, RouteTarget, RoutingPolicy};
pub use subscribers::{Subscribe, SubscriberSet};
pub use worker::{
    BOOTSTRAP_ENV, Bootstrap, Payload, PayloadContext, PreloadFn, ReadyHandle, WorkerRegistry,
    run_worker, run_worker_main,
};

// Optional: expose a simple built-in logger subscriber.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
