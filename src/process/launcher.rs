//! # Process-spawning capability.
//!
//! The pool never calls `fork`/`spawn` directly. It asks a [`Launch`]
//! implementation to start a child for a given [`Bootstrap`] and gets back a
//! [`Launched`] bundle:
//!
//! ```text
//! Launched {
//!   pid      ─► identity reported in events
//!   reader   ─► child stdout  (worker → master messages)
//!   writer   ─► child stdin   (master → worker messages)
//!   exit     ─► resolves once with the ExitReason
//!   kill     ─► one-shot hard kill (no grace)
//! }
//! ```
//!
//! [`ProcessLauncher`] is the default implementation on top of `tokio::process`.

use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::process::Command;
use tokio::sync::oneshot;
use tracing::debug;

use super::exit::ExitReason;
use crate::channel::{BoxedReader, BoxedWriter};
use crate::worker::{BOOTSTRAP_ENV, Bootstrap};

/// Executable (and fixed arguments) that hosts the worker payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerCommand {
    /// Program to execute.
    pub program: PathBuf,
    /// Arguments passed verbatim.
    pub args: Vec<OsString>,
    /// Extra environment variables.
    pub envs: Vec<(OsString, OsString)>,
}

impl WorkerCommand {
    /// Runs `program` with no extra arguments.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
        }
    }

    /// Re-executes the current binary (the usual setup: one binary acting as
    /// supervisor or worker depending on [`BOOTSTRAP_ENV`]).
    pub fn current_exe() -> io::Result<Self> {
        Ok(Self::new(std::env::current_exe()?))
    }

    /// Appends an argument.
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Adds an environment variable.
    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }
}

/// A started child process, as seen by the supervisor.
pub struct Launched {
    /// OS process id.
    pub pid: u32,
    /// Worker → master half of the control channel.
    pub reader: BoxedReader,
    /// Master → worker half of the control channel.
    pub writer: BoxedWriter,
    /// Resolves once the process has exited.
    pub exit: BoxFuture<'static, ExitReason>,
    /// Fire to kill the process immediately.
    pub kill: oneshot::Sender<()>,
}

/// Capability: start a child process for a worker.
pub trait Launch: Send + Sync + 'static {
    /// Starts one child. Must not block.
    fn launch(&self, bootstrap: &Bootstrap) -> io::Result<Launched>;
}

/// Default launcher: runs a [`WorkerCommand`] with piped stdin/stdout and
/// inherited stderr.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    command: WorkerCommand,
}

impl ProcessLauncher {
    /// Creates a launcher for `command`.
    pub fn new(command: WorkerCommand) -> Self {
        Self { command }
    }
}

impl Launch for ProcessLauncher {
    fn launch(&self, bootstrap: &Bootstrap) -> io::Result<Launched> {
        let encoded = bootstrap
            .encode()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

        let mut cmd = Command::new(&self.command.program);
        cmd.args(&self.command.args)
            .envs(self.command.envs.iter().map(|(k, v)| (k, v)))
            .env(BOOTSTRAP_ENV, encoded)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let mut child = cmd.spawn()?;
        let pid = child
            .id()
            .ok_or_else(|| io::Error::other("child exited before its pid was read"))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| io::Error::other("child stdin not captured"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("child stdout not captured"))?;

        let (kill, mut kill_rx) = oneshot::channel::<()>();
        let exit = async move {
            let status = tokio::select! {
                status = child.wait() => status,
                Ok(()) = &mut kill_rx => {
                    debug!(pid, "sending SIGKILL to worker");
                    let _ = child.start_kill();
                    child.wait().await
                }
            };
            match status {
                Ok(status) => ExitReason::from(status),
                Err(_) => ExitReason::Unknown,
            }
        }
        .boxed();

        Ok(Launched {
            pid,
            reader: Box::new(stdout),
            writer: Box::new(stdin),
            exit,
            kill,
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::channel::{ChannelReader, ChannelWriter, ControlMessage};

    #[tokio::test]
    async fn test_exit_code_is_reported() {
        let launcher = ProcessLauncher::new(WorkerCommand::new("sh").arg("-c").arg("exit 3"));
        let launched = launcher.launch(&Bootstrap::new("noop")).unwrap();
        assert!(launched.pid > 0);
        assert_eq!(launched.exit.await, ExitReason::Exited(3));
    }

    #[tokio::test]
    async fn test_kill_is_reported_as_signal() {
        let launcher = ProcessLauncher::new(WorkerCommand::new("sleep").arg("30"));
        let launched = launcher.launch(&Bootstrap::new("noop")).unwrap();
        launched.kill.send(()).unwrap();
        assert_eq!(launched.exit.await, ExitReason::Signaled(9));
    }

    #[tokio::test]
    async fn test_bootstrap_and_pipes() {
        // Echo the bootstrap back as an unknown message, then echo stdin.
        let script = r#"printf '{"type":"boot","raw":%s}\n' "$POOLVISOR_BOOTSTRAP"; cat"#;
        let launcher = ProcessLauncher::new(WorkerCommand::new("sh").arg("-c").arg(script));
        let launched = launcher.launch(&Bootstrap::new("echo")).unwrap();

        let mut reader = ChannelReader::new(launched.reader);
        let mut writer = ChannelWriter::new(launched.writer);
        writer.send(&ControlMessage::Ping).await.unwrap();
        // The boot line is an unknown kind and gets skipped.
        assert_eq!(reader.recv().await.unwrap(), Some(ControlMessage::Ping));

        drop(writer);
        assert_eq!(launched.exit.await, ExitReason::Exited(0));
    }
}
