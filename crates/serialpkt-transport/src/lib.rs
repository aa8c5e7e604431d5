//! Non-blocking byte transports for serialpkt.
//!
//! The packet engine consumes one byte per call and never waits for input.
//! This crate provides the transports that feed it:
//! - [`StreamTransport`] over any `Read + Write` stream (files, sockets, ttys)
//! - [`MemoryTransport`] in-memory loopback pairs for tests and simulations
//! - [`SerialDevice`] serial ports opened with [`serial::open`]
//!
//! This is the lowest layer of serialpkt. Everything else talks to a link
//! through the [`ByteTransport`] trait defined here.

pub mod error;
pub mod memory;
pub mod serial;
pub mod stream;
pub mod traits;

pub use error::{Result, TransportError};
pub use memory::MemoryTransport;
pub use serial::SerialDevice;
pub use stream::StreamTransport;
pub use traits::ByteTransport;
