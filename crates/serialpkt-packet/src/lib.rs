//! Byte-at-a-time packet framing for serial links.
//!
//! Every packet is framed with:
//! - a start byte (`0x7E`) and a stop byte (`0x81`)
//! - an 8-bit packet ID and a 16-bit big-endian command
//! - an overhead byte anchoring the delimiter-stuffing chain
//! - a 16-bit big-endian payload length and CRC-16 checksum
//!
//! The receiver is a state machine that consumes exactly one byte per call
//! and never blocks, so it can be driven from a polling loop, an interrupt
//! handler or a [`SerialTransfer`] wrapping any byte transport.

pub mod buffer;
pub mod callback;
pub mod checksum;
pub mod clock;
pub mod codec;
pub mod config;
pub mod error;
pub mod freshness;
pub mod packet;
pub mod parser;
pub mod status;
pub mod stuffing;
pub mod transfer;

pub use buffer::{Field, PayloadBuffer};
pub use callback::{CallbackTable, PacketHandler, ReceivedPacket};
pub use checksum::crc16;
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use codec::{
    encode_frame, frame_len, DEFAULT_TIMEOUT, MAX_PAYLOAD, NO_OVERHEAD, PACKET_SIZE,
    POSTAMBLE_SIZE, PREAMBLE_SIZE, START_BYTE, STOP_BYTE,
};
pub use config::PacketConfig;
pub use error::{LinkError, PacketError, Result};
pub use freshness::FreshnessPolicy;
pub use packet::Packet;
pub use parser::ParserState;
pub use status::Status;
pub use transfer::SerialTransfer;
