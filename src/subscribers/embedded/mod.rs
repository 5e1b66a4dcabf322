//! Built-in subscribers.
//!
//! - [`LogWriter`]: renders every event as a structured `tracing` record.

mod log;

pub use log::LogWriter;
