//! Child processes: the spawning capability and exit analysis.
//!
//! ## Contents
//! - [`Launch`] capability trait used by the supervisor to start workers
//! - [`ProcessLauncher`] default implementation on `tokio::process`
//! - [`WorkerCommand`] which executable hosts the payload
//! - [`ExitReason`] normalized exit status (code or signal)

mod exit;
mod launcher;

#[cfg(test)]
pub(crate) mod testing;

pub use exit::ExitReason;
pub use launcher::{Launch, Launched, ProcessLauncher, WorkerCommand};
