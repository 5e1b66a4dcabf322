//! # OS signal helpers for front-door binaries.
//!
//! - [`wait_for_shutdown_signal`] completes on `SIGINT`, `SIGTERM` or `SIGQUIT`
//!   (Ctrl-C on Windows).
//! - [`wait_for_reload_signal`] completes on `SIGHUP` (never on Windows).
//!
//! Each call creates independent signal listeners.

/// Waits for a termination signal.
///
/// Returns `Err` if signal registration fails.
#[cfg(unix)]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = sigint.recv()  => {},
        _ = sigterm.recv() => {},
        _ = sigquit.recv() => {},
    }
    Ok(())
}

/// Waits for a termination signal.
///
/// Returns `Err` if signal registration fails.
#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}

/// Waits for a reload request (`SIGHUP`).
#[cfg(unix)]
pub async fn wait_for_reload_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sighup = signal(SignalKind::hangup())?;
    sighup.recv().await;
    Ok(())
}

/// Waits for a reload request. There is no reload signal here; never completes.
#[cfg(not(unix))]
pub async fn wait_for_reload_signal() -> std::io::Result<()> {
    std::future::pending().await
}
