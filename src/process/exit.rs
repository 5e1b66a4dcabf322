//! Exit analysis for worker processes.

use std::fmt;

/// Why a worker process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// Normal exit with status code.
    Exited(i32),
    /// Killed by a signal (raw signal number).
    Signaled(i32),
    /// Status could not be determined (wait failed).
    Unknown,
}

impl ExitReason {
    /// `true` for exit code 0.
    pub fn is_clean(&self) -> bool {
        matches!(self, Self::Exited(0))
    }

    /// Human-readable description.
    pub fn description(&self) -> String {
        match self {
            Self::Exited(code) => format!("exited with code {code}"),
            Self::Signaled(sig) => format!("killed by signal {}", signal_name(*sig)),
            Self::Unknown => "unknown reason".to_string(),
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description())
    }
}

impl From<std::process::ExitStatus> for ExitReason {
    fn from(status: std::process::ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return Self::Exited(code);
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(sig) = status.signal() {
                return Self::Signaled(sig);
            }
        }
        Self::Unknown
    }
}

#[cfg(unix)]
fn signal_name(sig: i32) -> String {
    match nix::sys::signal::Signal::try_from(sig) {
        Ok(signal) => signal.as_str().to_string(),
        Err(_) => sig.to_string(),
    }
}

#[cfg(not(unix))]
fn signal_name(sig: i32) -> String {
    sig.to_string()
}
