//! Bounded message formatting
//!
//! Formats into a caller-provided fixed buffer so the producer path never
//! allocates. Output is truncated on a UTF-8 boundary and any NUL byte is
//! replaced with a space, keeping the payload valid for NUL framing.

use core::fmt;

use crate::buffer::TERMINATOR;

/// `fmt::Write` adapter over a fixed byte buffer that truncates on overflow
pub struct MessageWriter<'a> {
    buf: &'a mut [u8],
    len: usize,
    truncated: bool,
}

impl<'a> MessageWriter<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self {
            buf,
            len: 0,
            truncated: false,
        }
    }

    /// Bytes written so far
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether any output was cut off
    pub fn truncated(&self) -> bool {
        self.truncated
    }

    /// Consume the writer, returning the formatted payload
    pub fn into_bytes(self) -> &'a [u8] {
        &self.buf[..self.len]
    }
}

impl fmt::Write for MessageWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let room = self.buf.len() - self.len;
        let mut take = s.len().min(room);
        if take < s.len() {
            while !s.is_char_boundary(take) {
                take -= 1;
            }
            self.truncated = true;
        }

        let dest = &mut self.buf[self.len..self.len + take];
        dest.copy_from_slice(&s.as_bytes()[..take]);
        for byte in dest.iter_mut().filter(|b| **b == TERMINATOR) {
            *byte = b' ';
        }

        self.len += take;
        Ok(())
    }
}

/// Format `args` into `buf`, returning the (possibly truncated) payload
pub fn format_message<'a>(buf: &'a mut [u8], args: fmt::Arguments<'_>) -> &'a [u8] {
    let mut writer = MessageWriter::new(buf);
    // write_str never fails; a Display impl returning Err only cuts output short
    let _ = fmt::write(&mut writer, args);
    writer.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt::Write;

    #[test]
    fn test_format_fits() {
        let mut buf = [0u8; 32];
        let msg = format_message(&mut buf, format_args!("irq {} fired", 7));
        assert_eq!(msg, b"irq 7 fired");
    }

    #[test]
    fn test_format_truncates() {
        let mut buf = [0u8; 8];
        let msg = format_message(&mut buf, format_args!("{}", "0123456789"));
        assert_eq!(msg, b"01234567");
    }

    #[test]
    fn test_truncates_on_char_boundary() {
        let mut buf = [0u8; 5];
        let mut writer = MessageWriter::new(&mut buf);
        // the second three-byte char does not fit
        write!(writer, "ab€€").unwrap();
        assert!(writer.truncated());
        assert_eq!(writer.len(), 5);
        assert_eq!(std::str::from_utf8(writer.into_bytes()).unwrap(), "ab€");
    }

    #[test]
    fn test_truncation_drops_partial_char() {
        let mut buf = [0u8; 4];
        let msg = format_message(&mut buf, format_args!("ab€"));
        assert_eq!(msg, b"ab");
    }

    #[test]
    fn test_nul_replaced() {
        let mut buf = [0u8; 16];
        let msg = format_message(&mut buf, format_args!("a\0b{}", '\0'));
        assert_eq!(msg, b"a b ");
        assert!(!msg.contains(&0));
    }

    #[test]
    fn test_writes_after_full_are_ignored() {
        let mut buf = [0u8; 3];
        let mut writer = MessageWriter::new(&mut buf);
        write!(writer, "abc").unwrap();
        assert!(!writer.truncated());
        write!(writer, "d").unwrap();
        assert!(writer.truncated());
        assert_eq!(writer.into_bytes(), b"abc");
    }
}
