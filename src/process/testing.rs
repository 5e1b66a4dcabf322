//! In-memory launcher for driving the supervisor without real processes.
//!
//! Every launch yields a [`FakeChild`] on the receiver returned by
//! [`FakeLauncher::new`]; the test plays the worker's part through it.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use futures::FutureExt;
use tokio::io::DuplexStream;
use tokio::sync::{mpsc, oneshot};

use super::exit::ExitReason;
use super::launcher::{Launch, Launched};
use crate::channel::{ChannelReader, ChannelWriter, ControlMessage};
use crate::worker::Bootstrap;

/// Test side of one launched worker.
pub struct FakeChild {
    pub pid: u32,
    pub bootstrap: Bootstrap,
    to_master: ChannelWriter<DuplexStream>,
    from_master: ChannelReader<DuplexStream>,
    exit: Option<oneshot::Sender<ExitReason>>,
}

impl FakeChild {
    /// Reports the listen address (`spawning → spawned`).
    pub async fn listen(&mut self, addr: SocketAddr) {
        self.to_master
            .send(&ControlMessage::addr(addr))
            .await
            .expect("master end open");
    }

    /// Reports `127.0.0.1:<port>`.
    pub async fn listen_on(&mut self, port: u16) {
        self.listen(SocketAddr::from(([127, 0, 0, 1], port))).await;
    }

    /// Next message the master sent.
    pub async fn recv(&mut self) -> Option<ControlMessage> {
        self.from_master.recv().await.expect("pipe readable")
    }

    /// Makes the process exit with `code`.
    pub fn exit(&mut self, code: i32) {
        if let Some(tx) = self.exit.take() {
            let _ = tx.send(ExitReason::Exited(code));
        }
    }
}

/// Launcher producing [`FakeChild`]ren.
pub struct FakeLauncher {
    children: mpsc::UnboundedSender<FakeChild>,
    next_pid: AtomicU32,
    fail: Arc<AtomicBool>,
}

impl FakeLauncher {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<FakeChild>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let launcher = Self {
            children: tx,
            next_pid: AtomicU32::new(1000),
            fail: Arc::new(AtomicBool::new(false)),
        };
        (launcher, rx)
    }

    /// Switch that makes subsequent launches fail.
    pub fn fail_switch(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.fail)
    }
}

impl Launch for FakeLauncher {
    fn launch(&self, bootstrap: &Bootstrap) -> io::Result<Launched> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::NotFound, "no such program"));
        }

        let pid = self.next_pid.fetch_add(1, Ordering::SeqCst);
        let (master_read, child_write) = tokio::io::duplex(4096);
        let (child_read, master_write) = tokio::io::duplex(4096);
        let (exit_tx, exit_rx) = oneshot::channel();
        let (kill, kill_rx) = oneshot::channel::<()>();

        let exit = async move {
            tokio::select! {
                Ok(reason) = exit_rx => reason,
                Ok(()) = kill_rx => ExitReason::Signaled(9),
                else => ExitReason::Unknown,
            }
        }
        .boxed();

        let child = FakeChild {
            pid,
            bootstrap: bootstrap.clone(),
            to_master: ChannelWriter::new(child_write),
            from_master: ChannelReader::new(child_read),
            exit: Some(exit_tx),
        };
        let _ = self.children.send(child);

        Ok(Launched {
            pid,
            reader: Box::new(master_read),
            writer: Box::new(master_write),
            exit,
            kill,
        })
    }
}
