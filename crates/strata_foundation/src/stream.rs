//! The sequential byte stream boundary used by the snapshot protocol.
//!
//! The engine writes variable-length blocks with a size prefix, then seeks
//! back to patch the prefix once the block's true length is known. Any
//! sink that supports random seeking can implement [`Stream`];
//! [`MemoryStream`] is the in-memory implementation used by tests and
//! callers that snapshot to a byte buffer.

use crate::error::{Error, Result};

/// A sequential byte sink/source with random seeking.
///
/// All multi-byte integers on the wire are little-endian; the integer
/// helpers below are the only way the engine reads or writes them.
pub trait Stream {
    /// Writes all of `data` at the current position, advancing it.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink cannot accept the bytes.
    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Reads exactly `data.len()` bytes, advancing the position.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::StreamExhausted`](crate::ErrorKind::StreamExhausted)
    /// if insufficient data is available.
    fn read(&mut self, data: &mut [u8]) -> Result<()>;

    /// Returns the current read/write position.
    fn position(&self) -> u64;

    /// Moves the read/write position.
    ///
    /// # Errors
    ///
    /// Returns an error if the position is out of range for the stream.
    fn set_position(&mut self, position: u64) -> Result<()>;

    /// Advances the position by `count` bytes without reading them.
    ///
    /// # Errors
    ///
    /// Returns an error if the resulting position is out of range.
    fn skip(&mut self, count: u64) -> Result<()> {
        self.set_position(self.position() + count)
    }

    /// Writes one byte.
    ///
    /// # Errors
    ///
    /// See [`Stream::write`].
    fn write_u8(&mut self, value: u8) -> Result<()> {
        self.write(&[value])
    }

    /// Writes a little-endian `u32`.
    ///
    /// # Errors
    ///
    /// See [`Stream::write`].
    fn write_u32(&mut self, value: u32) -> Result<()> {
        self.write(&value.to_le_bytes())
    }

    /// Reads one byte.
    ///
    /// # Errors
    ///
    /// See [`Stream::read`].
    fn read_u8(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.read(&mut buf)?;
        Ok(buf[0])
    }

    /// Reads a little-endian `u32`.
    ///
    /// # Errors
    ///
    /// See [`Stream::read`].
    fn read_u32(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.read(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }
}

/// A growable in-memory [`Stream`].
///
/// Writes past the end grow the buffer; writes after a seek overwrite
/// existing bytes in place (this is how size prefixes get backpatched).
#[derive(Debug, Clone, Default)]
pub struct MemoryStream {
    data: Vec<u8>,
    position: usize,
}

impl MemoryStream {
    /// Creates a new empty stream positioned at 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a stream over existing bytes, positioned at 0.
    #[must_use]
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self { data, position: 0 }
    }

    /// Returns the underlying bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Returns a view of the underlying bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Returns the total stream length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if no bytes have been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Resets the position to 0 for re-reading.
    pub fn rewind(&mut self) {
        self.position = 0;
    }
}

impl Stream for MemoryStream {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        let end = self.position + data.len();
        if end > self.data.len() {
            self.data.resize(end, 0);
        }
        self.data[self.position..end].copy_from_slice(data);
        self.position = end;
        Ok(())
    }

    fn read(&mut self, data: &mut [u8]) -> Result<()> {
        let available = self.data.len() - self.position;
        if data.len() > available {
            return Err(Error::stream_exhausted(data.len(), available));
        }
        let end = self.position + data.len();
        data.copy_from_slice(&self.data[self.position..end]);
        self.position = end;
        Ok(())
    }

    fn position(&self) -> u64 {
        self.position as u64
    }

    fn set_position(&mut self, position: u64) -> Result<()> {
        if position > self.data.len() as u64 {
            return Err(Error::seek_out_of_range(position, self.data.len() as u64));
        }
        self.position = usize::try_from(position)
            .map_err(|_| Error::seek_out_of_range(position, self.data.len() as u64))?;
        Ok(())
    }
}
