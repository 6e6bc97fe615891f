//! NUL-Framed Byte Ring Buffer

use crate::IrqLogError;

/// Frame terminator
pub const TERMINATOR: u8 = 0;

/// Outcome of one consumer-side read attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame {
    /// Nothing queued
    Empty,
    /// Bytes queued but no terminator yet
    Incomplete,
    /// Zero-length frame consumed without output
    Skipped,
    /// Frame of the given length copied out
    Message(usize),
    /// Terminator further away than any producer can write
    Oversized { len: usize, read_pos: usize },
}

/// Fixed-capacity byte ring holding NUL-terminated frames
///
/// All methods take `&mut self`; callers serialize access with a critical
/// section so the cursor/`available` triple always moves together.
#[derive(Debug)]
pub struct RingBuffer {
    /// Pre-allocated storage
    storage: Box<[u8]>,
    /// Next byte the producer writes
    write_pos: usize,
    /// Next byte the consumer reads
    read_pos: usize,
    /// Free bytes; disambiguates full from empty when the cursors meet
    available: usize,
}

impl RingBuffer {
    /// Allocate a zeroed ring of `capacity` bytes
    pub fn with_capacity(capacity: usize) -> Result<Self, IrqLogError> {
        if capacity == 0 {
            return Err(IrqLogError::AllocationFailed(capacity));
        }

        let mut storage = Vec::new();
        storage
            .try_reserve_exact(capacity)
            .map_err(|_| IrqLogError::AllocationFailed(capacity))?;
        storage.resize(capacity, 0);

        Ok(Self {
            storage: storage.into_boxed_slice(),
            write_pos: 0,
            read_pos: 0,
            available: capacity,
        })
    }

    /// Get the buffer capacity
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Bytes free for writing
    pub fn available(&self) -> usize {
        self.available
    }

    /// Bytes currently queued, terminators included
    pub fn len(&self) -> usize {
        self.capacity() - self.available
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.read_pos == self.write_pos && self.available == self.capacity()
    }

    /// Get fill ratio (0.0 to 1.0)
    pub fn fill_ratio(&self) -> f64 {
        self.len() as f64 / self.capacity() as f64
    }

    pub fn write_pos(&self) -> usize {
        self.write_pos
    }

    pub fn read_pos(&self) -> usize {
        self.read_pos
    }

    /// Append `message` and its terminator, or reject it without touching state
    pub fn push_frame(&mut self, message: &[u8]) -> Result<(), IrqLogError> {
        debug_assert!(
            !message.contains(&TERMINATOR),
            "frame payload contains a terminator"
        );

        let needed = message.len() + 1;
        if self.available < needed {
            return Err(IrqLogError::Dropped {
                needed,
                available: self.available,
            });
        }

        let capacity = self.capacity();
        let head = message.len().min(capacity - self.write_pos);
        self.storage[self.write_pos..self.write_pos + head].copy_from_slice(&message[..head]);
        self.storage[..message.len() - head].copy_from_slice(&message[head..]);

        let terminator = (self.write_pos + message.len()) % capacity;
        self.storage[terminator] = TERMINATOR;

        self.write_pos = (self.write_pos + needed) % capacity;
        self.available -= needed;
        Ok(())
    }

    /// Pop the oldest frame into `out`
    ///
    /// `out.len()` is the largest payload accepted; a longer frame is reported
    /// as [`Frame::Oversized`] and left in place.
    pub fn pop_frame(&mut self, out: &mut [u8]) -> Frame {
        if self.is_empty() {
            return Frame::Empty;
        }

        let Some(null_pos) = self.find_terminator() else {
            return Frame::Incomplete;
        };

        let capacity = self.capacity();
        let len = if null_pos >= self.read_pos {
            null_pos - self.read_pos
        } else {
            capacity - self.read_pos + null_pos
        };

        if len > out.len() {
            return Frame::Oversized {
                len,
                read_pos: self.read_pos,
            };
        }

        if len > 0 {
            let head = len.min(capacity - self.read_pos);
            out[..head].copy_from_slice(&self.storage[self.read_pos..self.read_pos + head]);
            out[head..len].copy_from_slice(&self.storage[..len - head]);
        }

        self.read_pos = (self.read_pos + len + 1) % capacity;
        self.available += len + 1;

        if len == 0 {
            Frame::Skipped
        } else {
            Frame::Message(len)
        }
    }

    /// Discard everything queued
    pub fn clear(&mut self) {
        self.read_pos = self.write_pos;
        self.available = self.capacity();
    }

    /// Locate the next terminator at or after `read_pos`, wrapping once
    fn find_terminator(&self) -> Option<usize> {
        let find = |start: usize, end: usize| {
            self.storage[start..end]
                .iter()
                .position(|&b| b == TERMINATOR)
                .map(|offset| start + offset)
        };

        if self.write_pos > self.read_pos {
            find(self.read_pos, self.write_pos)
        } else {
            find(self.read_pos, self.capacity()).or_else(|| find(0, self.write_pos))
        }
    }
}
