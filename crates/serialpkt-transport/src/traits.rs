use crate::error::Result;

/// A point-to-point byte link the packet engine can be driven from.
///
/// Reads never block: [`bytes_available`](ByteTransport::bytes_available)
/// reports what can be consumed right now, and
/// [`read_byte`](ByteTransport::read_byte) returns `None` when nothing is
/// buffered. Writes push the whole slice out before returning.
pub trait ByteTransport {
    /// Write every byte of `bytes` to the link.
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()>;

    /// Number of bytes that can be read without waiting.
    fn bytes_available(&mut self) -> Result<usize>;

    /// Read the next byte, or `None` when no input is pending.
    fn read_byte(&mut self) -> Result<Option<u8>>;

    /// Flush any buffered output.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    /// Discard all pending input. Returns the number of bytes dropped.
    fn clear_input(&mut self) -> Result<usize> {
        let mut dropped = 0usize;
        while self.bytes_available()? > 0 {
            if self.read_byte()?.is_none() {
                break;
            }
            dropped += 1;
        }
        Ok(dropped)
    }
}

impl<T: ByteTransport + ?Sized> ByteTransport for &mut T {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).write_bytes(bytes)
    }

    fn bytes_available(&mut self) -> Result<usize> {
        (**self).bytes_available()
    }

    fn read_byte(&mut self) -> Result<Option<u8>> {
        (**self).read_byte()
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }

    fn clear_input(&mut self) -> Result<usize> {
        (**self).clear_input()
    }
}

impl<T: ByteTransport + ?Sized> ByteTransport for Box<T> {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).write_bytes(bytes)
    }

    fn bytes_available(&mut self) -> Result<usize> {
        (**self).bytes_available()
    }

    fn read_byte(&mut self) -> Result<Option<u8>> {
        (**self).read_byte()
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }

    fn clear_input(&mut self) -> Result<usize> {
        (**self).clear_input()
    }
}
