//! # Worker process main loop.
//!
//! ```text
//!  bootstrap ─► title ─► preloads ─► resolve payload ─► bind
//!                                                        │
//!            ┌───────────── select loop ─────────────────┘
//!            │  payload.serve()     → Ok: exit 0, Err: exit 1
//!            │  readiness           → send {"type":"addr"} (once)
//!            │  control channel     → die: arm deadline (first one wins)
//!            │                        ready: mark ready
//!            │  die deadline        → cancel ctx.shutdown, exit 0
//!            │  heartbeat tick      → send {"type":"ping"}; failure: exit 1
//!            └──────────────────────
//! ```
//!
//! A closed inbound channel does not end the worker; only a failed heartbeat
//! send is taken as proof that the supervisor is gone.

use std::future;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::bootstrap::Bootstrap;
use super::payload::{PayloadContext, ReadyHandle};
use super::registry::WorkerRegistry;
use super::title::set_process_title;
use crate::channel::{ChannelReader, ChannelWriter, ControlMessage};
use crate::error::WorkerError;

/// Runs the worker side on the given control channel halves.
///
/// Returns `Ok(())` for a clean exit (grace period elapsed or payload done).
pub async fn run_worker<R, W>(
    bootstrap: &Bootstrap,
    registry: &WorkerRegistry,
    input: R,
    output: W,
) -> Result<(), WorkerError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    if let Some(title) = bootstrap.process_title() {
        set_process_title(&title);
    }
    registry.run_preloads(bootstrap)?;
    let payload = registry.resolve(&bootstrap.payload)?;

    let listener = payload.bind().await.map_err(WorkerError::Bind)?;
    let addr = listener.local_addr().map_err(WorkerError::Bind)?;
    debug!(%addr, payload = %bootstrap.payload, "listener bound");

    let mut inbound = ChannelReader::new(input);
    let mut outbound = ChannelWriter::new(output);

    let (ready, mut ready_rx) = ReadyHandle::new(bootstrap.assume_ready);
    let shutdown = CancellationToken::new();
    let ctx = PayloadContext {
        ready: ready.clone(),
        shutdown: shutdown.clone(),
    };
    let serve = payload.serve(listener, ctx);
    tokio::pin!(serve);

    let mut heartbeat = bootstrap.ping_interval().map(|period| {
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    });

    let deadline = time::sleep(Duration::ZERO);
    tokio::pin!(deadline);
    let mut dying = false;
    let mut announced = false;
    let mut inbound_open = true;

    loop {
        if !announced && *ready_rx.borrow_and_update() {
            outbound.send(&ControlMessage::addr(addr)).await?;
            announced = true;
            info!(%addr, "worker ready");
        }

        tokio::select! {
            res = &mut serve => {
                if let Err(err) = &res {
                    error!(error = %err, "payload failed");
                } else {
                    debug!("payload finished");
                }
                return res;
            }
            () = &mut deadline, if dying => {
                debug!("grace period elapsed, exiting");
                shutdown.cancel();
                return Ok(());
            }
            Ok(()) = ready_rx.changed(), if !announced => {}
            msg = inbound.recv(), if inbound_open => match msg {
                Ok(Some(ControlMessage::Die { time: ms })) => {
                    if dying {
                        debug!(grace_ms = ms, "already dying, keeping the first deadline");
                    } else {
                        info!(grace_ms = ms, "asked to exit");
                        deadline.as_mut().reset(Instant::now() + Duration::from_millis(ms));
                        dying = true;
                    }
                }
                Ok(Some(ControlMessage::Ready)) => ready.ready(),
                Ok(Some(other)) => debug!(kind = other.kind(), "ignoring control message"),
                Ok(None) => {
                    debug!("control channel closed by supervisor");
                    inbound_open = false;
                }
                Err(err) => {
                    warn!(error = %err, "control channel read failed");
                    inbound_open = false;
                }
            },
            () = tick(&mut heartbeat) => {
                if let Err(err) = outbound.send(&ControlMessage::Ping).await {
                    error!(error = %err, "heartbeat failed, supervisor is gone");
                    return Err(err.into());
                }
            }
        }
    }
}

async fn tick(heartbeat: &mut Option<Interval>) {
    match heartbeat {
        Some(interval) => {
            interval.tick().await;
        }
        None => future::pending().await,
    }
}

/// Runs the worker on the process's stdin/stdout and returns its exit code.
///
/// Intended for `main` of a binary started by the pool:
///
/// ```rust,no_run
/// # async fn demo(registry: poolvisor::WorkerRegistry) {
/// if let Ok(Some(bootstrap)) = poolvisor::Bootstrap::from_env() {
///     std::process::exit(poolvisor::run_worker_main(bootstrap, &registry).await);
/// }
/// # }
/// ```
pub async fn run_worker_main(bootstrap: Bootstrap, registry: &WorkerRegistry) -> i32 {
    match run_worker(&bootstrap, registry, tokio::io::stdin(), tokio::io::stdout()).await {
        Ok(()) => 0,
        Err(err) => {
            error!(error = %err, label = err.as_label(), "worker exiting");
            1
        }
    }
}
