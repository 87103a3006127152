//! Growable in-memory byte sink.

use std::fmt::{Debug, Formatter};
use std::io;
use std::io::Read;

use bytes::buf::Reader;
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Buffer accumulates bytes from a single writer.
///
/// It owns its backing storage exclusively: readers obtained from
/// [`Buffer::reader`] work on a copy, and [`Buffer::freeze`] hands the
/// storage over once writing is done.
#[derive(Default, Clone, PartialEq, Eq)]
pub struct Buffer {
    inner: BytesMut,
}

impl Buffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty buffer with room for `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: BytesMut::with_capacity(capacity),
        }
    }

    /// Create a buffer holding everything `reader` yields until EOF.
    pub fn from_reader(reader: impl Read) -> io::Result<Self> {
        let mut buf = Self::with_capacity(256);
        buf.transfer_from(reader)?;
        Ok(buf)
    }

    /// Append raw bytes.
    pub fn write(&mut self, bs: &[u8]) {
        self.inner.put_slice(bs);
    }

    /// Drain `reader` into this buffer, returning how many bytes were adopted.
    pub fn transfer_from(&mut self, mut reader: impl Read) -> io::Result<u64> {
        let mut writer = (&mut self.inner).writer();
        io::copy(&mut reader, &mut writer)
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether nothing has been written yet.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Current contents as a byte slice.
    pub fn as_bytes(&self) -> &[u8] {
        &self.inner
    }

    /// A fresh reader over a snapshot of the current contents.
    ///
    /// Later writes to the buffer are not visible through the returned reader.
    pub fn reader(&self) -> Reader<Bytes> {
        Bytes::copy_from_slice(&self.inner).reader()
    }

    /// Current contents decoded as UTF-8, replacing invalid sequences.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.inner).into_owned()
    }

    /// Finish writing and take the contents without copying.
    pub fn freeze(self) -> Bytes {
        self.inner.freeze()
    }
}

impl io::Write for Buffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Debug for Buffer {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer").field("len", &self.len()).finish()
    }
}
