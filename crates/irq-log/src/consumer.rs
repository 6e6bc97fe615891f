//! Consumer task: drains the ring into the sink

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::buffer::Frame;
use crate::transport::Shared;

/// Draining side of the transport, owned by the consumer task
pub(crate) struct Consumer {
    shared: Arc<Shared>,
    wakeup: Arc<Semaphore>,
    stop: Arc<AtomicBool>,
    /// Copy-out scratch sized to the largest payload
    scratch: Vec<u8>,
}

impl Consumer {
    pub(crate) fn new(shared: Arc<Shared>, wakeup: Arc<Semaphore>, stop: Arc<AtomicBool>) -> Self {
        let scratch = vec![0u8; shared.config.max_message_length];
        Self {
            shared,
            wakeup,
            stop,
            scratch,
        }
    }

    /// Wait for wakeups and drain until the transport is torn down
    pub(crate) async fn run(mut self) {
        info!("Async log consumer started");
        let retry = Duration::from_millis(self.shared.config.wait_retry_ms);

        loop {
            match self.wakeup.acquire().await {
                Ok(permit) => permit.forget(),
                Err(e) => {
                    if self.stop.load(Ordering::Acquire) {
                        break;
                    }
                    warn!("Async log wakeup wait failed: {}", e);
                    tokio::time::sleep(retry).await;
                    continue;
                }
            }

            let drained = self.drain();
            if drained > 0 {
                debug!("Drained {} messages", drained);
            }
        }

        info!("Async log consumer stopped");
    }

    /// Forward every complete queued message to the sink
    ///
    /// Returns the number of messages emitted. Stops early on an incomplete
    /// frame; the producer's next wakeup resumes draining.
    pub(crate) fn drain(&mut self) -> usize {
        let mut emitted = 0;

        loop {
            let scratch = &mut self.scratch;
            let frame = critical_section::with(|cs| {
                match self.shared.control.borrow_ref_mut(cs).ring.as_mut() {
                    Some(ring) => ring.pop_frame(scratch),
                    None => Frame::Empty,
                }
            });

            match frame {
                Frame::Empty => break,
                Frame::Incomplete => {
                    debug!("Incomplete frame at head, waiting for producer");
                    break;
                }
                Frame::Skipped => continue,
                Frame::Message(len) => {
                    self.shared.sink.write_message(&self.scratch[..len]);
                    self.shared.delivered.fetch_add(1, Ordering::Relaxed);
                    emitted += 1;
                }
                Frame::Oversized { len, read_pos } => {
                    error!(
                        "Async log ring corrupted: {} byte frame at {} exceeds {}",
                        len, read_pos, self.shared.config.max_message_length
                    );
                    panic!(
                        "async log frame of {} bytes at {} exceeds max_message_length {}",
                        len, read_pos, self.shared.config.max_message_length
                    );
                }
            }
        }

        emitted
    }
}
