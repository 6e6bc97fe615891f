//! Async log transport: lifecycle, producer path and statistics

use core::cell::RefCell;
use core::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::buffer::RingBuffer;
use crate::config::{LogConfig, MAX_MESSAGE_LENGTH_LIMIT};
use crate::consumer::Consumer;
use crate::format::format_message;
use crate::sink::LogSink;
use crate::IrqLogError;

/// Minimum stack for the hosted consumer thread and its runtime
pub const MIN_HOSTED_STACK_SIZE: usize = 64 * 1024;

/// State guarded by the critical section
#[derive(Default)]
pub(crate) struct Control {
    pub(crate) ring: Option<RingBuffer>,
    pub(crate) wakeup: Option<Arc<Semaphore>>,
    pub(crate) dropped: u32,
}

/// State shared between producers and the consumer task
pub(crate) struct Shared {
    pub(crate) config: LogConfig,
    pub(crate) control: critical_section::Mutex<RefCell<Control>>,
    pub(crate) initialized: AtomicBool,
    pub(crate) delivered: AtomicU64,
    pub(crate) sink: Arc<dyn LogSink>,
}

/// Running consumer task and the handles needed to stop it
struct Worker {
    handle: JoinHandle<()>,
    wakeup: Arc<Semaphore>,
    stop: Arc<AtomicBool>,
}

struct Inner {
    shared: Arc<Shared>,
    /// Serializes init/deinit; never touched by producers
    worker: Mutex<Option<Worker>>,
}

/// Handle to an interrupt-safe deferred log transport
///
/// Producers call [`AsyncIrqLog::enqueue`] (or the [`irq_log!`](crate::irq_log)
/// macro) from any context; a dedicated consumer task drains the ring into the
/// configured [`LogSink`]. Cloning the handle is cheap and every clone refers
/// to the same transport. The transport is torn down when the last handle is
/// dropped.
#[derive(Clone)]
pub struct AsyncIrqLog {
    inner: Arc<Inner>,
}

impl AsyncIrqLog {
    /// Create an uninitialized transport
    pub fn new(config: LogConfig, sink: impl LogSink + 'static) -> Result<Self, IrqLogError> {
        config.validate()?;

        Ok(Self {
            inner: Arc::new(Inner {
                shared: Arc::new(Shared {
                    config,
                    control: critical_section::Mutex::new(RefCell::new(Control::default())),
                    initialized: AtomicBool::new(false),
                    delivered: AtomicU64::new(0),
                    sink: Arc::new(sink),
                }),
                worker: Mutex::new(None),
            }),
        })
    }

    /// Allocate the ring, create the wakeup semaphore and start the consumer
    ///
    /// Calling `init` on an initialized transport is a no-op.
    pub fn init(&self) -> Result<(), IrqLogError> {
        let shared = &self.inner.shared;
        let mut worker = self.lock_worker();
        if worker.is_some() {
            return Ok(());
        }

        let config = &shared.config;
        let ring = RingBuffer::with_capacity(config.buffer_size)?;
        let wakeup = Arc::new(Semaphore::new(0));
        let stop = Arc::new(AtomicBool::new(false));

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(|e| IrqLogError::InitFailed(format!("consumer runtime: {}", e)))?;

        let consumer = Consumer::new(shared.clone(), wakeup.clone(), stop.clone());
        let stack_size = config.consumer_task_stack_size.max(MIN_HOSTED_STACK_SIZE);
        let handle = thread::Builder::new()
            .name(config.consumer_task_name.clone())
            .stack_size(stack_size)
            .spawn(move || runtime.block_on(consumer.run()))
            .map_err(|e| {
                warn!("Async log consumer spawn failed, releasing ring");
                IrqLogError::InitFailed(format!("consumer task: {}", e))
            })?;

        critical_section::with(|cs| {
            let mut control = shared.control.borrow_ref_mut(cs);
            control.ring = Some(ring);
            control.wakeup = Some(wakeup.clone());
            control.dropped = 0;
        });
        shared.delivered.store(0, Ordering::Relaxed);
        shared.initialized.store(true, Ordering::Release);

        *worker = Some(Worker {
            handle,
            wakeup,
            stop,
        });

        info!(
            "Async log initialized: {} byte ring, {} byte messages, consumer '{}' (priority {}, stack {})",
            config.buffer_size,
            config.max_message_length,
            config.consumer_task_name,
            config.consumer_task_priority,
            stack_size
        );
        Ok(())
    }

    /// Stop the consumer and release the ring
    ///
    /// Messages still queued are discarded. A no-op when not initialized.
    pub fn deinit(&self) -> Result<(), IrqLogError> {
        let mut worker = self.lock_worker();
        let Some(running) = worker.take() else {
            return Ok(());
        };

        let discarded = shutdown(&self.inner.shared, running);
        info!("Async log deinitialized ({} queued bytes discarded)", discarded);
        Ok(())
    }

    /// Queue one message, truncated to `max_message_length`
    ///
    /// Never blocks or allocates; safe to call from interrupt handlers. When
    /// the ring lacks room the message is dropped and counted.
    pub fn enqueue(&self, message: &[u8]) -> Result<(), IrqLogError> {
        let shared = &self.inner.shared;
        if !shared.initialized.load(Ordering::Acquire) {
            return Err(IrqLogError::NotInitialized);
        }

        let message = &message[..message.len().min(shared.config.max_message_length)];

        let wakeup = critical_section::with(|cs| {
            let mut control = shared.control.borrow_ref_mut(cs);
            let control = &mut *control;

            let Some(ring) = control.ring.as_mut() else {
                return Err(IrqLogError::NotInitialized);
            };
            if let Err(e) = ring.push_frame(message) {
                control.dropped = control.dropped.wrapping_add(1);
                return Err(e);
            }
            Ok(control.wakeup.clone())
        })?;

        // Hosted signal: tokio takes its waiter lock briefly here
        if let Some(wakeup) = wakeup {
            wakeup.add_permits(1);
        }
        Ok(())
    }

    /// Format and queue a message; the backend of [`irq_log!`](crate::irq_log)
    pub fn log_fmt(&self, args: fmt::Arguments<'_>) -> Result<(), IrqLogError> {
        if !self.is_initialized() {
            return Err(IrqLogError::NotInitialized);
        }

        let mut buf = [0u8; MAX_MESSAGE_LENGTH_LIMIT];
        let limit = self.inner.shared.config.max_message_length;
        let message = format_message(&mut buf[..limit], args);
        self.enqueue(message)
    }

    /// Messages rejected for lack of space since init or the last reset
    pub fn drop_count(&self) -> u32 {
        critical_section::with(|cs| self.inner.shared.control.borrow_ref(cs).dropped)
    }

    pub fn reset_drop_count(&self) {
        critical_section::with(|cs| {
            self.inner.shared.control.borrow_ref_mut(cs).dropped = 0;
        });
    }

    /// Messages handed to the sink since init
    pub fn delivered_count(&self) -> u64 {
        self.inner.shared.delivered.load(Ordering::Relaxed)
    }

    /// Bytes queued, terminators included
    pub fn pending_bytes(&self) -> usize {
        critical_section::with(|cs| {
            self.inner
                .shared
                .control
                .borrow_ref(cs)
                .ring
                .as_ref()
                .map(RingBuffer::len)
                .unwrap_or(0)
        })
    }

    /// Get fill ratio (0.0 to 1.0); zero when not initialized
    pub fn fill_ratio(&self) -> f64 {
        critical_section::with(|cs| {
            self.inner
                .shared
                .control
                .borrow_ref(cs)
                .ring
                .as_ref()
                .map(RingBuffer::fill_ratio)
                .unwrap_or(0.0)
        })
    }

    /// Capacity of the live ring in bytes; zero when not initialized
    pub fn capacity(&self) -> usize {
        critical_section::with(|cs| {
            self.inner
                .shared
                .control
                .borrow_ref(cs)
                .ring
                .as_ref()
                .map(RingBuffer::capacity)
                .unwrap_or(0)
        })
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.shared.initialized.load(Ordering::Acquire)
    }

    pub fn config(&self) -> &LogConfig {
        &self.inner.shared.config
    }

    fn lock_worker(&self) -> std::sync::MutexGuard<'_, Option<Worker>> {
        self.inner
            .worker
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let worker = self
            .worker
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();

        if let Some(worker) = worker {
            shutdown(&self.shared, worker);
        }
    }
}

/// Mark the transport down, stop the consumer and free the ring
///
/// Returns the number of queued bytes discarded.
fn shutdown(shared: &Shared, worker: Worker) -> usize {
    shared.initialized.store(false, Ordering::Release);

    worker.stop.store(true, Ordering::Release);
    worker.wakeup.close();

    let discarded = critical_section::with(|cs| {
        let mut control = shared.control.borrow_ref_mut(cs);
        control.wakeup = None;
        control.ring.take().map(|ring| ring.len()).unwrap_or(0)
    });

    if worker.handle.thread().id() == thread::current().id() {
        debug!("Async log shut down from consumer task, not joining");
    } else if worker.handle.join().is_err() {
        warn!("Async log consumer panicked before shutdown");
    }

    discarded
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idle_log(config: LogConfig) -> AsyncIrqLog {
        AsyncIrqLog::new(config, |_: &[u8]| {}).unwrap()
    }

    #[test]
    fn test_enqueue_before_init() {
        let log = idle_log(LogConfig::default());
        assert!(matches!(log.enqueue(b"early"), Err(IrqLogError::NotInitialized)));
        assert_eq!(log.drop_count(), 0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = LogConfig {
            buffer_size: 8,
            max_message_length: 8,
            ..Default::default()
        };
        assert!(matches!(
            AsyncIrqLog::new(config, |_: &[u8]| {}),
            Err(IrqLogError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_deinit_when_uninitialized_is_noop() {
        let log = idle_log(LogConfig::default());
        log.deinit().unwrap();
        assert!(!log.is_initialized());
    }

    #[test]
    fn test_init_allocation_failure_leaves_transport_down() {
        // Passes validation, but no allocator can reserve it
        let log = idle_log(LogConfig {
            buffer_size: usize::MAX,
            ..Default::default()
        });

        assert!(matches!(log.init(), Err(IrqLogError::AllocationFailed(_))));
        assert!(!log.is_initialized());
        assert_eq!(log.capacity(), 0);
        assert!(matches!(log.enqueue(b"lost"), Err(IrqLogError::NotInitialized)));
        assert_eq!(log.drop_count(), 0);
        assert!(log.lock_worker().is_none());

        log.deinit().unwrap();
        assert!(!log.is_initialized());
    }

    #[test]
    fn test_capacity_follows_lifecycle() {
        let log = idle_log(LogConfig::default());
        assert_eq!(log.capacity(), 0);

        log.init().unwrap();
        assert_eq!(log.capacity(), 2048);

        log.deinit().unwrap();
        assert_eq!(log.capacity(), 0);
        assert_eq!(log.pending_bytes(), 0);
    }

    #[test]
    fn test_init_is_idempotent() {
        let log = idle_log(LogConfig::default());
        log.init().unwrap();
        log.enqueue(b"kept").unwrap();
        log.init().unwrap();

        assert!(log.is_initialized());
        assert_eq!(log.capacity(), 2048);
        log.deinit().unwrap();
    }

    #[test]
    fn test_drop_count_reset() {
        let log = idle_log(LogConfig::default());
        log.init().unwrap();
        critical_section::with(|cs| {
            log.inner.shared.control.borrow_ref_mut(cs).dropped = 42;
        });
        assert_eq!(log.drop_count(), 42);

        log.reset_drop_count();
        assert_eq!(log.drop_count(), 0);
        log.deinit().unwrap();
    }
}
