//! Worker-process side of the pool.
//!
//! A binary started by the pool finds a [`Bootstrap`] in [`BOOTSTRAP_ENV`],
//! resolves its [`Payload`] from a [`WorkerRegistry`] and hands control to
//! [`run_worker_main`], which speaks the control channel on stdin/stdout.
//!
//! Logs of a worker must go to stderr: stdout carries the control channel.

mod bootstrap;
mod payload;
mod registry;
mod runtime;
mod title;

pub use bootstrap::{BOOTSTRAP_ENV, Bootstrap};
pub use payload::{Payload, PayloadContext, ReadyHandle};
pub use registry::{PreloadFn, WorkerRegistry};
pub use runtime::{run_worker, run_worker_main};
