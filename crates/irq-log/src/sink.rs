//! Synchronous output sinks fed by the consumer task

use std::io::Write;
use std::sync::Mutex;
use tracing::{info, warn};

/// Destination for drained messages
///
/// Only ever called from the consumer task, so implementations may block.
/// The payload is exactly the bytes that were enqueued, which need not be
/// valid UTF-8.
pub trait LogSink: Send + Sync {
    /// Emit one complete message (no terminator, no line ending)
    fn write_message(&self, message: &[u8]);
}

impl<F> LogSink for F
where
    F: Fn(&[u8]) + Send + Sync,
{
    fn write_message(&self, message: &[u8]) {
        self(message)
    }
}

/// Forwards drained messages to the `tracing` subscriber
///
/// Invalid UTF-8 is shown as U+FFFD.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn write_message(&self, message: &[u8]) {
        info!(target: "irq_log", "{}", String::from_utf8_lossy(message));
    }
}

/// Serial-console style sink writing `message\r\n` to any `io::Write`
pub struct WriterSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Recover the wrapped writer
    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<W: Write + Send> LogSink for WriterSink<W> {
    fn write_message(&self, message: &[u8]) {
        let mut writer = self
            .writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let result = writer
            .write_all(message)
            .and_then(|_| writer.write_all(b"\r\n"))
            .and_then(|_| writer.flush());

        if let Err(e) = result {
            warn!("Log sink write failed: {}", e);
        }
    }
}
