//! Serial devices opened through the `serialport` crate.
//!
//! The port is configured 8N1 with no flow control. Reads never wait: only
//! bytes the driver reports as queued are pulled in. Writes block for at
//! most the port timeout.

use std::io::{ErrorKind, Read, Write};
use std::path::Path;
use std::time::Duration;

use bytes::{Buf, BytesMut};
use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::info;

use crate::error::{Result, TransportError};
use crate::traits::ByteTransport;

/// Default line speed used when none is requested.
pub const DEFAULT_BAUD: u32 = 115_200;

/// How long a write may block before failing.
pub const DEFAULT_PORT_TIMEOUT: Duration = Duration::from_millis(200);

const READ_CHUNK_SIZE: usize = 256;

/// Open `path` at `baud` as a byte transport.
pub fn open(path: impl AsRef<Path>, baud: u32) -> Result<SerialDevice> {
    let path = path.as_ref();
    let port = serialport::new(path.to_string_lossy(), baud)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .timeout(DEFAULT_PORT_TIMEOUT)
        .open()
        .map_err(|err| TransportError::Open {
            path: path.to_path_buf(),
            source: err.into(),
        })?;

    info!(?path, baud, "opened serial device");
    Ok(SerialDevice::new(port))
}

/// A serial port wrapped as a [`ByteTransport`].
pub struct SerialDevice {
    port: Box<dyn SerialPort>,
    rx: BytesMut,
}

impl SerialDevice {
    /// Wrap an already opened port.
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        Self {
            port,
            rx: BytesMut::with_capacity(READ_CHUNK_SIZE),
        }
    }

    /// Device name reported by the driver, if any.
    pub fn name(&self) -> Option<String> {
        self.port.name()
    }

    pub fn port(&self) -> &dyn SerialPort {
        &*self.port
    }

    pub fn port_mut(&mut self) -> &mut dyn SerialPort {
        &mut *self.port
    }

    /// Return the port. Input already buffered here is lost.
    pub fn into_inner(self) -> Box<dyn SerialPort> {
        self.port
    }

    fn queued(&self) -> Result<usize> {
        let queued = self.port.bytes_to_read().map_err(serial_error)?;
        Ok(queued as usize)
    }

    fn fill(&mut self) -> Result<()> {
        let want = self.queued()?.min(READ_CHUNK_SIZE);
        if want == 0 {
            return Ok(());
        }

        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            match self.port.read(&mut chunk[..want]) {
                Ok(n) => {
                    self.rx.extend_from_slice(&chunk[..n]);
                    return Ok(());
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    return Ok(())
                }
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }

    fn output_error(&self, err: std::io::Error) -> TransportError {
        match err.kind() {
            ErrorKind::TimedOut | ErrorKind::WouldBlock => {
                TransportError::WriteTimeout(self.port.timeout())
            }
            _ => TransportError::Io(err),
        }
    }
}

impl ByteTransport for SerialDevice {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.port.write_all(bytes).map_err(|err| self.output_error(err))
    }

    fn bytes_available(&mut self) -> Result<usize> {
        Ok(self.rx.len() + self.queued()?)
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
        self.port.flush().map_err(|err| self.output_error(err))
    }

    fn clear_input(&mut self) -> Result<usize> {
        let dropped = self.rx.len() + self.queued()?;
        self.rx.clear();
        self.port.clear(ClearBuffer::Input).map_err(serial_error)?;
        Ok(dropped)
    }
}

impl std::fmt::Debug for SerialDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialDevice")
            .field("name", &self.port.name())
            .field("buffered", &self.rx.len())
            .finish()
    }
}

fn serial_error(err: serialport::Error) -> TransportError {
    TransportError::Io(err.into())
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;

    #[test]
    fn missing_device_reports_open_error() {
        let err = open("/nonexistent/serialpkt-device", DEFAULT_BAUD).unwrap_err();
        assert!(matches!(err, TransportError::Open { .. }));
        assert!(err.to_string().contains("/nonexistent/serialpkt-device"));
    }

    #[cfg(unix)]
    fn pty_pair() -> (SerialDevice, SerialDevice) {
        let (master, slave) = serialport::TTYPort::pair().expect("pty pair");
        (SerialDevice::new(Box::new(master)), SerialDevice::new(Box::new(slave)))
    }

    #[cfg(unix)]
    fn wait_for(device: &mut SerialDevice, count: usize) -> usize {
        let deadline = Instant::now() + Duration::from_secs(2);
        loop {
            let available = device.bytes_available().unwrap();
            if available >= count || Instant::now() >= deadline {
                return available;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[cfg(unix)]
    #[test]
    fn bytes_cross_a_pty() {
        let (mut near, mut far) = pty_pair();
        near.write_bytes(&[0x7E, 0x01, 0x02, 0x81]).unwrap();
        near.flush().unwrap();

        assert_eq!(wait_for(&mut far, 4), 4);
        let mut received = Vec::new();
        while let Some(byte) = far.read_byte().unwrap() {
            received.push(byte);
        }
        assert_eq!(received, vec![0x7E, 0x01, 0x02, 0x81]);
        assert_eq!(far.bytes_available().unwrap(), 0);
        assert_eq!(far.read_byte().unwrap(), None);
    }

    #[cfg(unix)]
    #[test]
    fn clear_input_drops_queued_bytes() {
        let (mut near, mut far) = pty_pair();
        near.write_bytes(&[1, 2, 3, 4, 5]).unwrap();
        assert_eq!(wait_for(&mut far, 5), 5);

        assert_eq!(far.read_byte().unwrap(), Some(1));
        assert_eq!(far.clear_input().unwrap(), 4);
        assert_eq!(far.bytes_available().unwrap(), 0);
    }
}
