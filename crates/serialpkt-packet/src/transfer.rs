use serialpkt_transport::ByteTransport;
use tracing::{debug, trace};

use crate::callback::CallbackTable;
use crate::clock::{Clock, MonotonicClock};
use crate::codec::MAX_PAYLOAD;
use crate::config::PacketConfig;
use crate::error::Result;
use crate::packet::Packet;
use crate::status::Status;

/// A packet engine bound to a byte transport.
///
/// Outgoing frames are written to the transport in one piece. Incoming bytes
/// are pulled only when [`available`](Self::available) is called; nothing
/// here blocks waiting for input.
#[derive(Debug)]
pub struct SerialTransfer<T, C = MonotonicClock> {
    transport: T,
    packet: Packet<C>,
}

impl<T: ByteTransport> SerialTransfer<T, MonotonicClock> {
    /// Wrap `transport` with a default engine.
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, PacketConfig::default())
    }

    pub fn with_config(transport: T, config: PacketConfig) -> Self {
        Self::from_parts(transport, Packet::with_config(config))
    }
}

impl<T: ByteTransport, C: Clock> SerialTransfer<T, C> {
    /// Pair an existing engine with a transport.
    pub fn from_parts(transport: T, packet: Packet<C>) -> Self {
        Self { transport, packet }
    }

    /// Install per-packet-ID callbacks.
    pub fn with_callbacks(mut self, callbacks: CallbackTable) -> Self {
        self.packet.set_callbacks(Some(callbacks));
        self
    }

    /// Frame the first `len` bytes of the transmit buffer and write them.
    ///
    /// Returns the number of payload bytes sent (clamped to
    /// [`MAX_PAYLOAD`]).
    pub fn send_data(&mut self, len: u16, command: u16, packet_id: u8) -> Result<u16> {
        let len = self.packet.construct_packet(len, command, packet_id);
        let payload = &self.packet.tx_buff().as_slice()[..usize::from(len)];

        self.transport.write_bytes(self.packet.preamble())?;
        self.transport.write_bytes(payload)?;
        self.transport.write_bytes(self.packet.postamble())?;
        self.transport.flush()?;

        trace!(packet_id, command, len, "sent packet");
        Ok(len)
    }

    /// Copy `payload` into the transmit buffer and send it.
    pub fn send_payload(&mut self, payload: &[u8], command: u16, packet_id: u8) -> Result<u16> {
        let len = payload.len().min(MAX_PAYLOAD);
        self.packet.tx_bytes(&payload[..len], 0);
        self.send_data(len as u16, command, packet_id)
    }

    /// Process whatever input is pending.
    ///
    /// Bytes are fed to the parser until a packet completes, an error occurs
    /// or the input runs dry. When nothing is pending the parser is told so,
    /// which reports [`Status::NoData`]. On any error status the pending
    /// input is discarded and the engine reset.
    ///
    /// Returns the payload length of a completed packet, `0` otherwise.
    pub fn available(&mut self) -> Result<u16> {
        let mut completed = 0;

        if self.transport.bytes_available()? > 0 {
            while let Some(byte) = self.transport.read_byte()? {
                completed = self.packet.parse(byte, true);
                if self.packet.status() != Status::Continue {
                    break;
                }
            }
        } else {
            completed = self.packet.parse(0xFF, false);
        }

        if self.packet.status().is_error() {
            if let Some(err) = self.packet.last_error() {
                debug!(error = %err, "packet error, flushing input");
            }
            self.reset()?;
        }

        Ok(completed)
    }

    /// Whether [`available`](Self::available) completed a packet.
    pub fn tick(&mut self) -> Result<bool> {
        Ok(self.available()? > 0)
    }

    /// Discard pending input and reset the engine.
    pub fn reset(&mut self) -> Result<()> {
        let dropped = self.transport.clear_input()?;
        if dropped > 0 {
            trace!(dropped, "discarded pending input");
        }
        self.packet.reset();
        Ok(())
    }

    pub fn status(&self) -> Status {
        self.packet.status()
    }

    pub fn bytes_read(&self) -> u16 {
        self.packet.bytes_read()
    }

    pub fn current_command(&self) -> u16 {
        self.packet.current_command()
    }

    pub fn current_packet_id(&self) -> u8 {
        self.packet.current_packet_id()
    }

    pub fn current_received(&self) -> u16 {
        self.packet.current_received()
    }

    /// Payload of the packet completed by the last call to
    /// [`available`](Self::available).
    pub fn received(&self) -> &[u8] {
        self.packet.received()
    }

    pub fn packet(&self) -> &Packet<C> {
        &self.packet
    }

    pub fn packet_mut(&mut self) -> &mut Packet<C> {
        &mut self.packet
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_inner(self) -> (T, Packet<C>) {
        (self.transport, self.packet)
    }
}
