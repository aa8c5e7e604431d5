use bytes::{BufMut, BytesMut};
use tracing::trace;

use crate::buffer::{Field, PayloadBuffer};
use crate::callback::CallbackTable;
use crate::checksum::crc16;
use crate::clock::{Clock, MonotonicClock};
use crate::codec::{self, MAX_PAYLOAD, POSTAMBLE_SIZE, PREAMBLE_SIZE};
use crate::config::PacketConfig;
use crate::error::PacketError;
use crate::parser::ParserState;
use crate::status::Status;
use crate::stuffing;

/// The packet engine: builds outgoing frames and parses incoming bytes.
///
/// One engine serves one link. It owns both payload buffers and all parse
/// state, and reuses them for every packet. It is not meant to be shared
/// between concurrent callers.
#[derive(Debug)]
pub struct Packet<C = MonotonicClock> {
    pub(crate) tx_buff: PayloadBuffer,
    pub(crate) rx_buff: PayloadBuffer,
    preamble: [u8; PREAMBLE_SIZE],
    postamble: [u8; POSTAMBLE_SIZE],

    pub(crate) state: ParserState,
    pub(crate) prev_byte: u8,
    pub(crate) bytes_to_rec: u16,
    pub(crate) pay_index: u16,
    pub(crate) id_byte: u8,
    overhead_byte: u8,
    pub(crate) rec_overhead_byte: u8,
    pub(crate) command: u16,
    pub(crate) recv_crc: u16,

    pub(crate) packet_start: Option<u32>,
    pub(crate) packet_last: u32,

    pub(crate) bytes_read: u16,
    pub(crate) status: Status,
    pub(crate) last_error: Option<PacketError>,

    pub(crate) config: PacketConfig,
    pub(crate) timeout_ms: u32,
    pub(crate) callbacks: Option<CallbackTable>,
    pub(crate) clock: C,
}

impl Packet<MonotonicClock> {
    /// Create an engine with default configuration.
    pub fn new() -> Self {
        Self::with_config(PacketConfig::default())
    }

    /// Create an engine with explicit configuration.
    pub fn with_config(config: PacketConfig) -> Self {
        Self::with_clock(config, MonotonicClock::new())
    }
}

impl Default for Packet<MonotonicClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> Packet<C> {
    /// Create an engine reading time from `clock`.
    pub fn with_clock(config: PacketConfig, clock: C) -> Self {
        Self {
            tx_buff: PayloadBuffer::new(),
            rx_buff: PayloadBuffer::new(),
            preamble: codec::preamble(0, 0, 0, 0),
            postamble: codec::postamble(0),
            state: ParserState::StartByte,
            prev_byte: 0,
            bytes_to_rec: 0,
            pay_index: 0,
            id_byte: 0,
            overhead_byte: 0,
            rec_overhead_byte: 0,
            command: 0,
            recv_crc: 0,
            packet_start: None,
            packet_last: 0,
            bytes_read: 0,
            status: Status::Continue,
            last_error: None,
            timeout_ms: config.timeout_millis(),
            config,
            callbacks: None,
            clock,
        }
    }

    /// Install the table of per-packet-ID handlers.
    pub fn with_callbacks(mut self, callbacks: CallbackTable) -> Self {
        self.callbacks = Some(callbacks);
        self
    }

    /// Replace (or remove) the callback table.
    pub fn set_callbacks(&mut self, callbacks: Option<CallbackTable>) {
        self.callbacks = callbacks;
    }

    /// Frame the first `payload_len` bytes of the transmit buffer.
    ///
    /// Lengths over [`MAX_PAYLOAD`] are silently clamped. In packed mode the
    /// payload is stuffed in place. After this call [`preamble`](Self::preamble),
    /// the transmit buffer prefix and [`postamble`](Self::postamble) form the
    /// wire frame. Returns the number of payload bytes framed.
    pub fn construct_packet(&mut self, payload_len: u16, command: u16, packet_id: u8) -> u16 {
        let size = usize::from(payload_len).min(MAX_PAYLOAD);
        let payload = &mut self.tx_buff.as_mut_slice()[..size];

        if self.config.packed {
            self.overhead_byte = stuffing::stuff(payload);
        }
        let checksum = crc16(payload);

        self.preamble = codec::preamble(packet_id, command, self.overhead_byte, size as u16);
        self.postamble = codec::postamble(checksum);

        trace!(
            packet_id,
            command,
            overhead = self.overhead_byte,
            len = size,
            checksum,
            "constructed packet"
        );

        size as u16
    }

    /// Append the frame produced by the last
    /// [`construct_packet`](Self::construct_packet) call to `dst`.
    pub fn encode_into(&self, payload_len: u16, dst: &mut BytesMut) {
        let size = usize::from(payload_len).min(MAX_PAYLOAD);
        dst.reserve(codec::frame_len(size));
        dst.put_slice(&self.preamble);
        dst.put_slice(&self.tx_buff.as_slice()[..size]);
        dst.put_slice(&self.postamble);
    }

    /// Header of the most recently constructed frame.
    pub fn preamble(&self) -> &[u8; PREAMBLE_SIZE] {
        &self.preamble
    }

    /// Trailer of the most recently constructed frame.
    pub fn postamble(&self) -> &[u8; POSTAMBLE_SIZE] {
        &self.postamble
    }

    /// Overhead byte used by the most recently constructed frame.
    pub fn overhead_byte(&self) -> u8 {
        self.overhead_byte
    }

    /// Clear both buffers and return the parser to waiting for a start byte.
    ///
    /// The status is left as-is so callers can still inspect why a packet
    /// was dropped.
    pub fn reset(&mut self) {
        self.tx_buff.clear();
        self.rx_buff.clear();
        self.state = ParserState::StartByte;
        self.bytes_read = 0;
        self.bytes_to_rec = 0;
        self.pay_index = 0;
        self.recv_crc = 0;
        self.packet_start = None;
        self.packet_last = 0;
    }

    /// Copy `value` into the transmit buffer at `offset`; see
    /// [`PayloadBuffer::write_field`].
    pub fn tx_obj<T: Field>(&mut self, value: &T, offset: usize) -> usize {
        self.tx_buff.write_field(value, offset)
    }

    /// Read a value from the receive buffer at `offset`; see
    /// [`PayloadBuffer::read_field`].
    pub fn rx_obj<T: Field>(&self, offset: usize) -> Option<(T, usize)> {
        self.rx_buff.read_field(offset)
    }

    /// Copy raw bytes into the transmit buffer at `offset`.
    pub fn tx_bytes(&mut self, value: &[u8], offset: usize) -> usize {
        self.tx_buff.write_bytes(value, offset)
    }

    /// Borrow raw bytes from the receive buffer.
    pub fn rx_bytes(&self, offset: usize, size: usize) -> &[u8] {
        self.rx_buff.read_bytes(offset, size)
    }

    pub fn tx_buff(&self) -> &PayloadBuffer {
        &self.tx_buff
    }

    pub fn tx_buff_mut(&mut self) -> &mut PayloadBuffer {
        &mut self.tx_buff
    }

    pub fn rx_buff(&self) -> &PayloadBuffer {
        &self.rx_buff
    }

    /// Payload of the last completed packet.
    ///
    /// Empty unless the most recent call reported [`Status::NewData`].
    pub fn received(&self) -> &[u8] {
        &self.rx_buff.as_slice()[..usize::from(self.bytes_read)]
    }

    /// Command of the last parsed packet.
    pub fn current_command(&self) -> u16 {
        self.command
    }

    /// ID of the last parsed packet.
    pub fn current_packet_id(&self) -> u8 {
        self.id_byte
    }

    /// Payload length announced by the last parsed header.
    pub fn current_received(&self) -> u16 {
        self.bytes_to_rec
    }

    /// Payload bytes completed by the most recent call.
    pub fn bytes_read(&self) -> u16 {
        self.bytes_read
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// Cause of the most recent discarded packet, if any.
    pub fn last_error(&self) -> Option<&PacketError> {
        self.last_error.as_ref()
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    pub fn config(&self) -> &PacketConfig {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}
