//! Reliable packet framing over serial links.
//!
//! serialpkt frames payloads of up to 1014 bytes with a start byte, packet ID,
//! command word, stuffing overhead byte, length, CRC-16 and stop byte, and
//! parses them back one byte at a time.
//!
//! # Crate Structure
//!
//! - [`transport`]: byte transports (serial devices, generic streams, in-memory pairs)
//! - [`packet`]: the framing engine, codec and [`SerialTransfer`](packet::SerialTransfer)

/// Re-export transport types.
pub mod transport {
    pub use serialpkt_transport::*;
}

/// Re-export packet engine types.
pub mod packet {
    pub use serialpkt_packet::*;
}
