//! Supervisor↔worker control channel.
//!
//! One channel per worker, carried over the child's stdin (master → worker)
//! and stdout (worker → master). Worker diagnostics therefore go to stderr.
//!
//! ## Contents
//! - [`ControlMessage`] the four message kinds (`addr`, `ready`, `die`, `ping`)
//! - [`ChannelReader`] / [`ChannelWriter`] JSON-lines framing shared by both ends

mod protocol;
mod transport;

pub use protocol::ControlMessage;
pub use transport::{BoxedReader, BoxedWriter, ChannelReader, ChannelWriter, MAX_FRAME_LEN};
