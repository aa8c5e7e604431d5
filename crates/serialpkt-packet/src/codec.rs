use std::time::Duration;

use bytes::{BufMut, BytesMut};

use crate::checksum::crc16;
use crate::stuffing;

/// Marks the first byte of every frame.
pub const START_BYTE: u8 = 0x7E;

/// Marks the last byte of every frame.
pub const STOP_BYTE: u8 = 0x81;

/// Header: start (1) + ID (1) + command (2) + overhead (1) + length (2).
pub const PREAMBLE_SIZE: usize = 7;

/// Trailer: checksum (2) + stop (1).
pub const POSTAMBLE_SIZE: usize = 3;

/// Total frame capacity on the wire.
pub const PACKET_SIZE: usize = 0x400;

/// Maximum payload bytes per packet.
pub const MAX_PAYLOAD: usize = PACKET_SIZE - PREAMBLE_SIZE - POSTAMBLE_SIZE;

/// Overhead byte value meaning "payload contains no stuffed delimiter".
pub const NO_OVERHEAD: u8 = 0xFF;

/// Default staleness timeout for partially received packets.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(50);

/// Wire size of a frame carrying `payload_len` bytes (after clamping).
pub fn frame_len(payload_len: usize) -> usize {
    PREAMBLE_SIZE + payload_len.min(MAX_PAYLOAD) + POSTAMBLE_SIZE
}

pub(crate) fn preamble(packet_id: u8, command: u16, overhead: u8, len: u16) -> [u8; PREAMBLE_SIZE] {
    let [command_hi, command_lo] = command.to_be_bytes();
    let [len_hi, len_lo] = len.to_be_bytes();
    [
        START_BYTE, packet_id, command_hi, command_lo, overhead, len_hi, len_lo,
    ]
}

pub(crate) fn postamble(checksum: u16) -> [u8; POSTAMBLE_SIZE] {
    let [crc_hi, crc_lo] = checksum.to_be_bytes();
    [crc_hi, crc_lo, STOP_BYTE]
}

/// Encode a standalone frame into `dst`.
///
/// Payloads longer than [`MAX_PAYLOAD`] are truncated. Returns the number of
/// payload bytes carried by the frame.
///
/// Wire format:
/// ```text
/// ┌──────┬────┬──────────┬──────────┬──────────┬───────────┬──────────┬──────┐
/// │ 0x7E │ ID │ Command  │ Overhead │ Length   │ Payload   │ CRC-16   │ 0x81 │
/// │ (1B) │(1B)│ (2B BE)  │ (1B)     │ (2B BE)  │ (Length)  │ (2B BE)  │ (1B) │
/// └──────┴────┴──────────┴──────────┴──────────┴───────────┴──────────┴──────┘
/// ```
pub fn encode_frame(
    payload: &[u8],
    command: u16,
    packet_id: u8,
    packed: bool,
    dst: &mut BytesMut,
) -> usize {
    let len = payload.len().min(MAX_PAYLOAD);
    let mut body = payload[..len].to_vec();
    let overhead = if packed {
        stuffing::stuff(&mut body)
    } else {
        0
    };

    dst.reserve(frame_len(len));
    dst.put_slice(&preamble(packet_id, command, overhead, len as u16));
    dst.put_slice(&body);
    dst.put_slice(&postamble(crc16(&body)));
    len
}
