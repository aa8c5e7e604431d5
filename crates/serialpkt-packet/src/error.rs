use crate::status::Status;

/// Why the parser discarded a packet.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PacketError {
    /// The checksum computed over the payload differs from the received one.
    #[error("checksum mismatch (computed {computed:#06x}, received {received:#06x})")]
    ChecksumMismatch { computed: u16, received: u16 },

    /// The command field is outside the accepted range.
    #[error("invalid command {0} (expected 1..={max})", max = crate::codec::MAX_PAYLOAD)]
    InvalidCommand(u16),

    /// The payload length field is outside the accepted range.
    #[error("invalid payload length {0} (expected 1..={max})", max = crate::codec::MAX_PAYLOAD)]
    InvalidPayloadLength(u16),

    /// The frame did not end with the stop byte.
    #[error("expected stop byte 0x81, found {0:#04x}")]
    StopByte(u8),

    /// The partial packet exceeded the freshness timeout.
    #[error("stale packet ({elapsed_ms} ms elapsed, timeout {timeout_ms} ms)")]
    StalePacket { elapsed_ms: u32, timeout_ms: u32 },
}

impl PacketError {
    /// The engine status reported alongside this error.
    pub const fn status(&self) -> Status {
        match self {
            PacketError::ChecksumMismatch { .. } => Status::ChecksumError,
            PacketError::InvalidCommand(_) | PacketError::InvalidPayloadLength(_) => {
                Status::PayloadError
            }
            PacketError::StopByte(_) => Status::StopByteError,
            PacketError::StalePacket { .. } => Status::StalePacketError,
        }
    }
}

/// Errors raised while driving a packet link over a transport.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] serialpkt_transport::TransportError),
}

pub type Result<T> = std::result::Result<T, LinkError>;
