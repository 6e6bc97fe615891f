//! Async log configuration

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::IrqLogError;

/// Default ring buffer capacity in bytes
pub const DEFAULT_BUFFER_SIZE: usize = 2048;

/// Default per-message payload cap in bytes (terminator excluded)
pub const DEFAULT_MAX_MESSAGE_LENGTH: usize = 128;

/// Largest payload the stack formatter can hold
pub const MAX_MESSAGE_LENGTH_LIMIT: usize = 512;

/// Highest consumer task priority accepted
pub const MAX_TASK_PRIORITY: u8 = 10;

/// Async log transport configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Ring buffer capacity in bytes (default: 2048)
    pub buffer_size: usize,
    /// Per-message payload cap in bytes (default: 128)
    pub max_message_length: usize,
    /// Scheduler priority of the draining task (default: 5)
    pub consumer_task_priority: u8,
    /// Stack reserved for the draining task in bytes (default: 2048)
    pub consumer_task_stack_size: usize,
    /// Name given to the draining task
    pub consumer_task_name: String,
    /// Back-off after a failed semaphore wait, in milliseconds
    pub wait_retry_ms: u64,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            max_message_length: DEFAULT_MAX_MESSAGE_LENGTH,
            consumer_task_priority: 5,
            consumer_task_stack_size: 2048,
            consumer_task_name: "async_irq_log".to_string(),
            wait_retry_ms: 10,
        }
    }
}

impl LogConfig {
    /// Small footprint preset for memory-constrained targets
    pub fn compact() -> Self {
        Self {
            buffer_size: 512,
            max_message_length: 64,
            ..Default::default()
        }
    }

    /// Preset for bursty interrupt sources
    pub fn burst() -> Self {
        Self {
            buffer_size: 16 * 1024,
            max_message_length: 256,
            consumer_task_priority: 7,
            ..Default::default()
        }
    }

    /// Load configuration from an optional file plus `IRQ_LOG_*` environment overrides
    pub fn load(path: &str) -> Result<Self, IrqLogError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("IRQ_LOG").try_parsing(true))
            .build()?;

        let loaded: LogConfig = settings.try_deserialize()?;
        loaded.validate()?;

        debug!("Loaded async log config from {}: {:?}", path, loaded);
        Ok(loaded)
    }

    /// Check that the options are mutually consistent
    pub fn validate(&self) -> Result<(), IrqLogError> {
        if self.max_message_length == 0 {
            return Err(IrqLogError::InvalidConfig(
                "max_message_length must be non-zero".to_string(),
            ));
        }
        if self.max_message_length > MAX_MESSAGE_LENGTH_LIMIT {
            return Err(IrqLogError::InvalidConfig(format!(
                "max_message_length {} exceeds limit {}",
                self.max_message_length, MAX_MESSAGE_LENGTH_LIMIT
            )));
        }
        if self.buffer_size < self.frame_limit() {
            return Err(IrqLogError::InvalidConfig(format!(
                "buffer_size {} cannot hold one {} byte frame",
                self.buffer_size,
                self.frame_limit()
            )));
        }
        if self.consumer_task_priority > MAX_TASK_PRIORITY {
            return Err(IrqLogError::InvalidConfig(format!(
                "consumer_task_priority {} above {}",
                self.consumer_task_priority, MAX_TASK_PRIORITY
            )));
        }
        if self.consumer_task_stack_size == 0 {
            return Err(IrqLogError::InvalidConfig(
                "consumer_task_stack_size must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Largest frame on the ring: payload plus terminator
    pub fn frame_limit(&self) -> usize {
        self.max_message_length + 1
    }
}
