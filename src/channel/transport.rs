//! Line-framed transport for [`ControlMessage`]s.
//!
//! Both ends of the channel use the same halves:
//! - supervisor: reads the child's stdout, writes the child's stdin;
//! - worker: reads its own stdin, writes its own stdout.
//!
//! Framing is newline-delimited via [`LinesCodec`] with a bounded line length.
//! Undecodable or unknown frames are skipped (logged), only I/O failures surface.

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};
use tracing::{debug, warn};

use super::protocol::ControlMessage;
use crate::error::ChannelError;

/// Upper bound for one frame. Control messages are tiny; anything larger is garbage.
pub const MAX_FRAME_LEN: usize = 64 * 1024;

/// Boxed read half, as handed out by launchers.
pub type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
/// Boxed write half, as handed out by launchers.
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Receiving half of a control channel.
pub struct ChannelReader<R> {
    frames: FramedRead<R, LinesCodec>,
}

impl<R: AsyncRead + Unpin> ChannelReader<R> {
    /// Wraps a byte stream.
    pub fn new(inner: R) -> Self {
        Self {
            frames: FramedRead::new(inner, LinesCodec::new_with_max_length(MAX_FRAME_LEN)),
        }
    }

    /// Receives the next understood message.
    ///
    /// Returns `Ok(None)` on EOF. Blank, malformed, oversized and unknown
    /// frames are skipped.
    pub async fn recv(&mut self) -> Result<Option<ControlMessage>, ChannelError> {
        while let Some(frame) = self.frames.next().await {
            let line = match frame {
                Ok(line) => line,
                Err(err) => match ChannelError::from(err) {
                    ChannelError::Io(e) => return Err(ChannelError::Io(e)),
                    other => {
                        warn!(error = %other, "skipping control frame");
                        continue;
                    }
                },
            };
            if line.trim().is_empty() {
                continue;
            }
            match ControlMessage::from_line(&line) {
                Ok(ControlMessage::Unknown) => {
                    debug!(frame = %line, "ignoring unknown control message");
                }
                Ok(msg) => return Ok(Some(msg)),
                Err(err) => {
                    warn!(error = %err, "skipping undecodable control frame");
                }
            }
        }
        Ok(None)
    }
}

/// Sending half of a control channel.
pub struct ChannelWriter<W> {
    frames: FramedWrite<W, LinesCodec>,
}

impl<W: AsyncWrite + Unpin> ChannelWriter<W> {
    /// Wraps a byte sink.
    pub fn new(inner: W) -> Self {
        Self {
            frames: FramedWrite::new(inner, LinesCodec::new_with_max_length(MAX_FRAME_LEN)),
        }
    }

    /// Encodes and flushes one message.
    ///
    /// An error here means the peer is unreachable (e.g. `EPIPE` once the
    /// other process is gone).
    pub async fn send(&mut self, msg: &ControlMessage) -> Result<(), ChannelError> {
        let line = msg.to_line()?;
        self.frames.send(line).await.map_err(ChannelError::from)
    }
}
