//! Error types used by the pool supervisor, the control channel and worker processes.
//!
//! - [`PoolError`] errors returned by the [`Pool`](crate::Pool) handle.
//! - [`ChannelError`] failures of the supervisor↔worker control channel.
//! - [`WorkerError`] fatal errors inside a worker process.
//!
//! Each type provides `as_label()` for logs/metrics.
//!
//! Worker crashes are **not** errors here: they are recovered by the pool and
//! reported through the notification stream ([`Event`](crate::Event)).

use std::io;
use thiserror::Error;

/// # Errors returned by the pool handle.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// The supervisor has shut down (or is shutting down) and accepts no more requests.
    #[error("pool is closed")]
    Closed,

    /// The child process for a new worker could not be started.
    #[error("failed to launch worker: {reason}")]
    Launch {
        /// The underlying error message.
        reason: String,
    },

    /// A member of the incoming cohort died before becoming ready; the reload was abandoned.
    #[error("reload failed: {reason}")]
    ReloadFailed {
        /// What went wrong.
        reason: String,
    },
}

impl PoolError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use poolvisor::PoolError;
    ///
    /// assert_eq!(PoolError::Closed.as_label(), "pool_closed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            PoolError::Closed => "pool_closed",
            PoolError::Launch { .. } => "pool_launch_failed",
            PoolError::ReloadFailed { .. } => "pool_reload_failed",
        }
    }
}

/// # Control-channel failures.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Underlying pipe failed.
    #[error("channel io: {0}")]
    Io(#[from] io::Error),

    /// Line framing failed (oversized or non-UTF-8 frame).
    #[error("channel framing: {0}")]
    Frame(String),

    /// A message could not be encoded.
    #[error("channel encode: {0}")]
    Encode(#[from] serde_json::Error),

    /// The peer is gone (writer task ended or pipe closed).
    #[error("channel closed")]
    Closed,
}

impl ChannelError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ChannelError::Io(_) => "channel_io",
            ChannelError::Frame(_) => "channel_frame",
            ChannelError::Encode(_) => "channel_encode",
            ChannelError::Closed => "channel_closed",
        }
    }
}

impl From<tokio_util::codec::LinesCodecError> for ChannelError {
    fn from(err: tokio_util::codec::LinesCodecError) -> Self {
        match err {
            tokio_util::codec::LinesCodecError::Io(e) => ChannelError::Io(e),
            other => ChannelError::Frame(other.to_string()),
        }
    }
}

/// # Fatal errors inside a worker process.
///
/// Any of these ends the worker with a non-zero exit code, which the supervisor
/// observes as a crash.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum WorkerError {
    /// The bootstrap environment variable is missing or malformed.
    #[error("invalid bootstrap: {0}")]
    Bootstrap(String),

    /// The requested payload is not registered in this binary.
    #[error("unknown payload '{0}'")]
    UnknownPayload(String),

    /// A preload hook is unknown or failed.
    #[error("preload '{name}' failed: {reason}")]
    Preload {
        /// Hook name as listed in `requires`.
        name: String,
        /// Failure description.
        reason: String,
    },

    /// The payload could not bind its listener.
    #[error("bind failed: {0}")]
    Bind(io::Error),

    /// The control channel to the supervisor failed.
    #[error(transparent)]
    Channel(#[from] ChannelError),

    /// The payload's serve loop failed.
    #[error("payload failed: {0}")]
    Serve(String),
}

impl WorkerError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            WorkerError::Bootstrap(_) => "worker_bootstrap",
            WorkerError::UnknownPayload(_) => "worker_unknown_payload",
            WorkerError::Preload { .. } => "worker_preload",
            WorkerError::Bind(_) => "worker_bind",
            WorkerError::Channel(_) => "worker_channel",
            WorkerError::Serve(_) => "worker_serve",
        }
    }
}
