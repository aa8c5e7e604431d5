use std::io::{ErrorKind, Read, Write};
use std::thread;
use std::time::{Duration, Instant};

use bytes::{Buf, BytesMut};

use crate::error::{Result, TransportError};
use crate::traits::ByteTransport;

const INITIAL_BUFFER_CAPACITY: usize = 1024;
const READ_CHUNK_SIZE: usize = 256;
const WRITE_BACKOFF: Duration = Duration::from_millis(1);

/// How long a write may stay stalled on `WouldBlock` before giving up.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(1);

/// Adapts any `Read + Write` stream into a [`ByteTransport`].
///
/// The stream should be non-blocking or carry a short read timeout:
/// `WouldBlock` and `TimedOut` are reported as "no bytes available" rather
/// than errors. A zero-length read marks the stream as closed. Writes that
/// hit `WouldBlock` sleep briefly and retry until the write timeout expires.
pub struct StreamTransport<T> {
    inner: T,
    rx: BytesMut,
    closed: bool,
    write_timeout: Duration,
}

impl<T: Read + Write> StreamTransport<T> {
    /// Wrap a stream.
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            rx: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            closed: false,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
        }
    }

    /// Limit how long a write may wait for the stream to accept bytes.
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Whether the underlying stream reported end of input.
    ///
    /// Buffered bytes may still be pending after the stream closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the transport and return the inner stream.
    ///
    /// Any input already buffered is lost.
    pub fn into_inner(self) -> T {
        self.inner
    }

    fn back_off(&self, stalled_since: &mut Option<Instant>) -> Result<()> {
        let since = *stalled_since.get_or_insert_with(Instant::now);
        if since.elapsed() >= self.write_timeout {
            return Err(TransportError::WriteTimeout(self.write_timeout));
        }
        thread::sleep(WRITE_BACKOFF);
        Ok(())
    }

    fn fill(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }

        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            match self.inner.read(&mut chunk) {
                Ok(0) => {
                    self.closed = true;
                    return Ok(());
                }
                Ok(n) => {
                    self.rx.extend_from_slice(&chunk[..n]);
                    return Ok(());
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err)
                    if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
                {
                    return Ok(())
                }
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }
}

impl<T: Read + Write> ByteTransport for StreamTransport<T> {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let mut offset = 0usize;
        let mut stalled_since = None;
        while offset < bytes.len() {
            match self.inner.write(&bytes[offset..]) {
                Ok(0) => {
                    return Err(TransportError::Closed {
                        written: offset,
                        total: bytes.len(),
                    })
                }
                Ok(n) => {
                    offset += n;
                    stalled_since = None;
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => {
                    self.back_off(&mut stalled_since)?
                }
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
        Ok(())
    }

    fn bytes_available(&mut self) -> Result<usize> {
        if self.rx.is_empty() {
            self.fill()?;
        }
        Ok(self.rx.len())
    }

    fn read_byte(&mut self) -> Result<Option<u8>> {
        if self.rx.is_empty() {
            self.fill()?;
        }
        if self.rx.has_remaining() {
            Ok(Some(self.rx.get_u8()))
        } else {
            Ok(None)
        }
    }

    fn flush(&mut self) -> Result<()> {
        let mut stalled_since = None;
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => {
                    self.back_off(&mut stalled_since)?
                }
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }

    fn clear_input(&mut self) -> Result<usize> {
        let mut dropped = self.rx.len();
        self.rx.clear();
        loop {
            let before = self.rx.len();
            self.fill()?;
            let read = self.rx.len() - before;
            if read == 0 {
                break;
            }
            dropped += read;
            self.rx.clear();
        }
        Ok(dropped)
    }
}

impl<T> std::fmt::Debug for StreamTransport<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamTransport")
            .field("buffered", &self.rx.len())
            .field("closed", &self.closed)
            .field("write_timeout", &self.write_timeout)
            .finish()
    }
}
