//! Async Log Error Types

use thiserror::Error;

/// Errors returned by the async log transport
#[derive(Debug, Error)]
pub enum IrqLogError {
    /// Transport used before `init` or after `deinit`
    #[error("Async log transport is not initialized")]
    NotInitialized,

    /// Not enough free space in the ring for the message and its terminator
    #[error("Message dropped: {needed} bytes needed, {available} available")]
    Dropped { needed: usize, available: usize },

    /// Backing storage could not be allocated
    #[error("Failed to allocate {0} byte ring buffer")]
    AllocationFailed(usize),

    /// Wakeup semaphore or consumer task could not be created
    #[error("Async log init failed: {0}")]
    InitFailed(String),

    /// Configuration values are inconsistent
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration source could not be read or parsed
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl IrqLogError {
    /// Whether this is the expected best-effort drop outcome
    pub fn is_dropped(&self) -> bool {
        matches!(self, IrqLogError::Dropped { .. })
    }
}
