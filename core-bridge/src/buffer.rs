//! Host-owned output buffer for `convert`.
//!
//! The buffer is zero-filled to its capacity and lent to the engine as
//! `&mut [u8]` for the duration of one call. The engine copies at most
//! `capacity` bytes and reports how many bytes the complete output needs;
//! the façade only records a result that fits.

use bytes::{Bytes, BytesMut};
use core_runtime::config::DEFAULT_MAX_BUFFER_CAPACITY;

use crate::error::{CoreError, Result};

/// Byte buffer the engine writes converted output into.
#[derive(Debug, Clone)]
pub struct OutputBuffer {
    bytes: BytesMut,
    written: usize,
    max_capacity: usize,
}

impl OutputBuffer {
    /// Buffer of `capacity` bytes, growable up to the default maximum.
    pub fn new(capacity: usize) -> Self {
        Self::with_limit(capacity, DEFAULT_MAX_BUFFER_CAPACITY.max(capacity))
    }

    /// Buffer of `capacity` bytes, growable up to `max_capacity`.
    pub fn with_limit(capacity: usize, max_capacity: usize) -> Self {
        let mut bytes = BytesMut::with_capacity(capacity);
        bytes.resize(capacity, 0);
        Self {
            bytes,
            written: 0,
            max_capacity: max_capacity.max(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    pub fn max_capacity(&self) -> usize {
        self.max_capacity
    }

    /// Bytes produced by the last successful conversion.
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn as_written(&self) -> &[u8] {
        &self.bytes[..self.written]
    }

    /// The written bytes as text, when they are valid UTF-8 (XML output).
    pub fn as_utf8(&self) -> Option<&str> {
        std::str::from_utf8(self.as_written()).ok()
    }

    /// Grows the buffer to hold at least `required` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::BufferTooSmall`] when `required` exceeds the
    /// maximum capacity; the buffer is left unchanged.
    pub fn grow_to(&mut self, required: usize) -> Result<()> {
        if required <= self.capacity() {
            return Ok(());
        }
        if required > self.max_capacity {
            return Err(CoreError::BufferTooSmall {
                required,
                capacity: self.capacity(),
            });
        }
        self.bytes.resize(required, 0);
        Ok(())
    }

    /// Moves the written bytes out and resets the buffer for reuse.
    pub fn take(&mut self) -> Bytes {
        let capacity = self.capacity();
        let output = self.bytes.split_to(self.written).freeze();
        self.bytes.resize(capacity, 0);
        self.clear();
        output
    }

    /// Zero-fills the buffer and forgets the last result.
    pub fn clear(&mut self) {
        self.bytes.fill(0);
        self.written = 0;
    }

    /// Lends the whole buffer to the engine and forgets the last result.
    pub(crate) fn lend(&mut self) -> &mut [u8] {
        self.written = 0;
        &mut self.bytes[..]
    }

    pub(crate) fn set_written(&mut self, written: usize) {
        debug_assert!(written <= self.capacity());
        self.written = written.min(self.capacity());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_buffer_is_zero_filled() {
        let buffer = OutputBuffer::new(16);
        assert_eq!(buffer.capacity(), 16);
        assert_eq!(buffer.written(), 0);
        assert!(buffer.as_written().is_empty());
        assert_eq!(buffer.max_capacity(), DEFAULT_MAX_BUFFER_CAPACITY);
    }

    #[test]
    fn written_bytes_are_exposed() {
        let mut buffer = OutputBuffer::new(8);
        buffer.lend()[..4].copy_from_slice(b"MThd");
        buffer.set_written(4);

        assert_eq!(buffer.as_written(), b"MThd");
        assert_eq!(buffer.as_utf8(), Some("MThd"));
    }

    #[test]
    fn grow_respects_limit() {
        let mut buffer = OutputBuffer::with_limit(4, 10);
        buffer.grow_to(2).unwrap();
        assert_eq!(buffer.capacity(), 4);

        buffer.grow_to(10).unwrap();
        assert_eq!(buffer.capacity(), 10);

        let err = buffer.grow_to(11).unwrap_err();
        assert!(matches!(
            err,
            CoreError::BufferTooSmall {
                required: 11,
                capacity: 10
            }
        ));
        assert_eq!(buffer.capacity(), 10);
    }

    #[test]
    fn take_resets_for_reuse() {
        let mut buffer = OutputBuffer::new(6);
        buffer.lend()[..3].copy_from_slice(b"<a>");
        buffer.set_written(3);

        let output = buffer.take();
        assert_eq!(&output[..], b"<a>");
        assert_eq!(buffer.capacity(), 6);
        assert_eq!(buffer.written(), 0);
        assert!(buffer.lend().iter().all(|byte| *byte == 0));
    }

    #[test]
    fn limit_never_below_capacity() {
        let buffer = OutputBuffer::with_limit(64, 8);
        assert_eq!(buffer.max_capacity(), 64);
    }
}
