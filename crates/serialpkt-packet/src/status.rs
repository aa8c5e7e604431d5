/// Outcome of the most recent engine call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Status {
    /// A packet is in progress (or none started); no decision yet.
    #[default]
    Continue,
    /// A complete, validated packet is in the receive buffer.
    NewData,
    /// No input byte was available; parser state untouched.
    NoData,
    /// Received checksum did not match the payload.
    ChecksumError,
    /// Command or length field outside `1..=MAX_PAYLOAD`.
    PayloadError,
    /// The byte after the checksum was not the stop byte.
    StopByteError,
    /// The partial packet went stale before it completed.
    StalePacketError,
}

impl Status {
    /// Legacy numeric status code.
    ///
    /// Errors are `<= 0`, non-errors are positive.
    pub const fn code(self) -> i8 {
        match self {
            Status::Continue => 3,
            Status::NewData => 2,
            Status::NoData => 1,
            Status::ChecksumError => 0,
            Status::PayloadError => -1,
            Status::StopByteError => -2,
            Status::StalePacketError => -3,
        }
    }

    /// Map a legacy numeric code back to a status.
    pub const fn from_code(code: i8) -> Option<Self> {
        let status = match code {
            3 => Status::Continue,
            2 => Status::NewData,
            1 => Status::NoData,
            0 => Status::ChecksumError,
            -1 => Status::PayloadError,
            -2 => Status::StopByteError,
            -3 => Status::StalePacketError,
            _ => return None,
        };
        Some(status)
    }

    /// Whether this status reports a discarded packet.
    pub const fn is_error(self) -> bool {
        self.code() <= 0
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Continue => "continue",
            Status::NewData => "new_data",
            Status::NoData => "no_data",
            Status::ChecksumError => "checksum_error",
            Status::PayloadError => "payload_error",
            Status::StopByteError => "stop_byte_error",
            Status::StalePacketError => "stale_packet_error",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Status; 7] = [
        Status::Continue,
        Status::NewData,
        Status::NoData,
        Status::ChecksumError,
        Status::PayloadError,
        Status::StopByteError,
        Status::StalePacketError,
    ];

    #[test]
    fn codes_roundtrip() {
        for status in ALL {
            assert_eq!(Status::from_code(status.code()), Some(status));
        }
        assert_eq!(Status::from_code(4), None);
        assert_eq!(Status::from_code(-4), None);
    }

    #[test]
    fn only_discards_are_errors() {
        let errors: Vec<_> = ALL.into_iter().filter(|s| s.is_error()).collect();
        assert_eq!(
            errors,
            vec![
                Status::ChecksumError,
                Status::PayloadError,
                Status::StopByteError,
                Status::StalePacketError
            ]
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serializes_as_snake_case() {
        let json = serde_json::to_string(&Status::StalePacketError).unwrap();
        assert_eq!(json, "\"stale_packet_error\"");
    }
}
