//! # Application code hosted by a worker process.
//!
//! A [`Payload`] owns the listener of one worker. The runtime binds it, hands
//! it to [`Payload::serve`] together with a [`PayloadContext`] and reports the
//! bound address to the supervisor once the worker is ready.
//!
//! ## Readiness
//! With `assume_ready` (the default) the address is reported right after the
//! bind. Otherwise the payload calls [`ReadyHandle::ready`] when it can take
//! traffic (or the supervisor sends `ready`).
//!
//! ## Example
//! ```rust,no_run
//! use async_trait::async_trait;
//! use tokio::io::AsyncWriteExt;
//! use tokio::net::TcpListener;
//! use poolvisor::{Payload, PayloadContext, WorkerError};
//!
//! struct Hello;
//!
//! #[async_trait]
//! impl Payload for Hello {
//!     async fn serve(&self, listener: TcpListener, ctx: PayloadContext) -> Result<(), WorkerError> {
//!         loop {
//!             tokio::select! {
//!                 _ = ctx.shutdown.cancelled() => return Ok(()),
//!                 accepted = listener.accept() => {
//!                     let (mut sock, _) = accepted.map_err(|e| WorkerError::Serve(e.to_string()))?;
//!                     let _ = sock.write_all(b"hello\n").await;
//!                 }
//!             }
//!         }
//!     }
//! }
//! ```

use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::error::WorkerError;

/// Application served by each worker.
#[async_trait]
pub trait Payload: Send + Sync + 'static {
    /// Binds the worker's listener. Defaults to an ephemeral port on localhost.
    async fn bind(&self) -> io::Result<TcpListener> {
        TcpListener::bind(("127.0.0.1", 0)).await
    }

    /// Serves connections until the process exits.
    ///
    /// Returning `Ok` before a `die` was received ends the worker with code 0,
    /// returning an error ends it with code 1.
    async fn serve(&self, listener: TcpListener, ctx: PayloadContext) -> Result<(), WorkerError>;
}

/// Per-worker context handed to [`Payload::serve`].
#[derive(Clone)]
pub struct PayloadContext {
    /// Signals readiness when `assume_ready` is off.
    pub ready: ReadyHandle,
    /// Cancelled when the grace period after `die` has elapsed.
    pub shutdown: CancellationToken,
}

/// Readiness latch shared between the payload and the worker runtime.
#[derive(Clone)]
pub struct ReadyHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl ReadyHandle {
    pub(crate) fn new(initial: bool) -> (Self, watch::Receiver<bool>) {
        let (tx, rx) = watch::channel(initial);
        (Self { tx: Arc::new(tx) }, rx)
    }

    /// Marks the worker ready; the address is reported once.
    pub fn ready(&self) {
        self.tx.send_if_modified(|ready| !std::mem::replace(ready, true));
    }

    /// Whether readiness has been signalled.
    pub fn is_ready(&self) -> bool {
        *self.tx.borrow()
    }
}
