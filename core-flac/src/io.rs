//! # Byte Source & Sink Contracts
//!
//! The decoder pulls compressed bytes from a [`ByteSource`]; the encoder pushes
//! them into a seekable [`ByteSink`] so libFLAC can patch STREAMINFO once the
//! stream is finished. Both are owned by the codec instance for its lifetime
//! and closed when the instance closes.

use bytes::Bytes;
use parking_lot::Mutex;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Cursor, Read, Seek, SeekFrom, Write};
use std::sync::Arc;

/// A closable byte source read by the decoder.
///
/// `Ok(0)` from `read` signals end of data; any other error aborts decoding.
pub trait ByteSource: Read + Send {
    /// Release the source. Called once when the owning decoder closes.
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A closable, seekable byte sink written by the encoder.
pub trait ByteSink: Write + Seek + Send {
    /// Flush and release the sink. Called once when the owning encoder closes.
    fn close(&mut self) -> io::Result<()> {
        self.flush()
    }
}

impl ByteSource for File {}

impl<T: AsRef<[u8]> + Send> ByteSource for Cursor<T> {}

impl<R: Read + Send> ByteSource for BufReader<R> {}

impl ByteSink for File {
    fn close(&mut self) -> io::Result<()> {
        self.flush()?;
        self.sync_data()
    }
}

impl ByteSink for Cursor<Vec<u8>> {}

impl<W: Write + Seek + Send> ByteSink for BufWriter<W> {}

/// Cloneable in-memory sink.
///
/// Hand one clone to an encoder and keep another to read the encoded stream
/// back after the encoder is closed.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    inner: Arc<Mutex<Cursor<Vec<u8>>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything written so far.
    pub fn contents(&self) -> Vec<u8> {
        self.inner.lock().get_ref().clone()
    }

    /// Contents as shared bytes, ready for `Decoder::from_bytes`.
    pub fn to_bytes(&self) -> Bytes {
        Bytes::from(self.contents())
    }

    pub fn len(&self) -> usize {
        self.inner.lock().get_ref().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Write for MemorySink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.lock().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for MemorySink {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.lock().seek(pos)
    }
}

impl ByteSink for MemorySink {}
