//! Interrupt-Safe Async Log Transport
//!
//! Lets interrupt handlers and other non-blocking contexts emit log lines
//! without touching the (slow) output device. Producers copy NUL-framed
//! messages into a fixed byte ring under a critical section; a dedicated
//! consumer task wakes on a counting semaphore, drains complete frames in
//! FIFO order and forwards them to a synchronous [`LogSink`].
//!
//! When the ring is full the newest message is dropped and counted, so a
//! producer never blocks.
//!
//! ```no_run
//! use irq_log::{irq_log, AsyncIrqLog, LogConfig, TracingSink};
//!
//! let log = AsyncIrqLog::new(LogConfig::default(), TracingSink)?;
//! log.init()?;
//!
//! // From an interrupt handler:
//! let _ = irq_log!(log, "dma {} complete, {} bytes", 2, 512);
//!
//! log.deinit()?;
//! # Ok::<(), irq_log::IrqLogError>(())
//! ```

mod buffer;
mod config;
mod consumer;
mod error;
mod format;
mod sink;
mod transport;

pub use buffer::{Frame, RingBuffer, TERMINATOR};
pub use config::{
    LogConfig, DEFAULT_BUFFER_SIZE, DEFAULT_MAX_MESSAGE_LENGTH, MAX_MESSAGE_LENGTH_LIMIT,
    MAX_TASK_PRIORITY,
};
pub use error::IrqLogError;
pub use format::{format_message, MessageWriter};
pub use sink::{LogSink, TracingSink, WriterSink};
pub use transport::{AsyncIrqLog, MIN_HOSTED_STACK_SIZE};

/// Format a message and queue it on an [`AsyncIrqLog`]
///
/// Evaluates to the `Result` of [`AsyncIrqLog::log_fmt`]; callers in
/// interrupt context usually ignore it.
#[macro_export]
macro_rules! irq_log {
    ($log:expr, $($arg:tt)+) => {
        $log.log_fmt(::core::format_args!($($arg)+))
    };
}
