//! The receive state machine.
//!
//! [`Packet::parse`] consumes exactly one byte per call. Completion and every
//! error return the machine to [`ParserState::StartByte`]; errors also clear
//! the buffers.

use tracing::{debug, trace};

use crate::callback::ReceivedPacket;
use crate::checksum::crc16;
use crate::clock::Clock;
use crate::codec::{MAX_PAYLOAD, START_BYTE, STOP_BYTE};
use crate::error::PacketError;
use crate::packet::Packet;
use crate::status::Status;
use crate::stuffing;

/// Which field the parser expects next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ParserState {
    #[default]
    StartByte,
    IdByte,
    CommandHi,
    CommandLo,
    Overhead,
    LenHi,
    LenLo,
    Payload,
    CrcHi,
    CrcLo,
    EndByte,
}

/// What a single state transition decided.
enum Step {
    /// Keep going.
    Continue,
    /// A packet of this many payload bytes completed.
    Complete(u16),
    /// The packet was discarded.
    Failed(PacketError),
}

fn in_payload_range(value: u16) -> bool {
    value > 0 && usize::from(value) <= MAX_PAYLOAD
}

impl<C: Clock> Packet<C> {
    /// Feed one byte to the parser.
    ///
    /// `valid` says whether `byte` is real input. When it is `false` the call
    /// reports [`Status::NoData`] and leaves any partial packet intact.
    ///
    /// Returns the payload length when this byte completed a packet, `0`
    /// otherwise. Inspect [`status`](Self::status) for the outcome.
    pub fn parse(&mut self, byte: u8, valid: bool) -> u16 {
        if !valid {
            self.bytes_read = 0;
            self.status = Status::NoData;
            return 0;
        }

        let now = self.clock.now_millis();
        let policy = self.config.freshness;
        let (start, last) = (self.packet_start, self.packet_last);
        self.packet_last = now;

        if !policy.is_fresh(start, last, now, self.timeout_ms) {
            self.fail(PacketError::StalePacket {
                elapsed_ms: policy.elapsed(start, last, now).unwrap_or_default(),
                timeout_ms: self.timeout_ms,
            });
            return 0;
        }

        trace!(state = ?self.state, byte, "parse");

        match self.step(byte, now) {
            Step::Continue => {
                self.bytes_read = 0;
                self.status = Status::Continue;
                0
            }
            Step::Complete(len) => len,
            Step::Failed(err) => {
                self.fail(err);
                0
            }
        }
    }

    fn step(&mut self, byte: u8, now: u32) -> Step {
        match self.state {
            ParserState::StartByte => {
                if byte == START_BYTE {
                    self.state = ParserState::IdByte;
                    self.packet_start = Some(now);
                }
            }
            ParserState::IdByte => {
                self.id_byte = byte;
                self.state = ParserState::CommandHi;
            }
            ParserState::CommandHi => {
                self.prev_byte = byte;
                self.state = ParserState::CommandLo;
            }
            ParserState::CommandLo => {
                self.command = u16::from_be_bytes([self.prev_byte, byte]);
                if !in_payload_range(self.command) {
                    return Step::Failed(PacketError::InvalidCommand(self.command));
                }
                self.state = ParserState::Overhead;
            }
            ParserState::Overhead => {
                self.rec_overhead_byte = byte;
                self.state = ParserState::LenHi;
            }
            ParserState::LenHi => {
                self.prev_byte = byte;
                self.state = ParserState::LenLo;
            }
            ParserState::LenLo => {
                self.bytes_to_rec = u16::from_be_bytes([self.prev_byte, byte]);
                self.pay_index = 0;
                if !in_payload_range(self.bytes_to_rec) {
                    return Step::Failed(PacketError::InvalidPayloadLength(self.bytes_to_rec));
                }
                self.state = ParserState::Payload;
            }
            ParserState::Payload => {
                if self.pay_index < self.bytes_to_rec {
                    self.rx_buff.as_mut_slice()[usize::from(self.pay_index)] = byte;
                    self.pay_index += 1;
                }
                if self.pay_index == self.bytes_to_rec {
                    self.state = ParserState::CrcHi;
                }
            }
            ParserState::CrcHi => {
                self.prev_byte = byte;
                self.state = ParserState::CrcLo;
            }
            ParserState::CrcLo => {
                self.recv_crc = u16::from_be_bytes([self.prev_byte, byte]);
                let len = usize::from(self.bytes_to_rec);
                let computed = crc16(&self.rx_buff.as_slice()[..len]);
                if computed != self.recv_crc {
                    return Step::Failed(PacketError::ChecksumMismatch {
                        computed,
                        received: self.recv_crc,
                    });
                }
                self.state = ParserState::EndByte;
            }
            ParserState::EndByte => {
                self.state = ParserState::StartByte;
                if byte != STOP_BYTE {
                    return Step::Failed(PacketError::StopByte(byte));
                }
                return Step::Complete(self.complete());
            }
        }
        Step::Continue
    }

    fn complete(&mut self) -> u16 {
        let len = self.bytes_to_rec;
        let payload = &mut self.rx_buff.as_mut_slice()[..usize::from(len)];

        if self.config.packed {
            let restored = stuffing::unstuff(payload, self.rec_overhead_byte);
            trace!(overhead = self.rec_overhead_byte, restored, "unstuffed payload");
        }

        self.bytes_read = len;
        self.status = Status::NewData;
        self.last_error = None;
        self.packet_start = None;

        debug!(
            packet_id = self.id_byte,
            command = self.command,
            len,
            "received packet"
        );

        if let Some(callbacks) = self.callbacks.as_mut() {
            let packet = ReceivedPacket {
                id: self.id_byte,
                command: self.command,
                payload: &self.rx_buff.as_slice()[..usize::from(len)],
            };
            callbacks.dispatch(&packet);
        }

        len
    }

    fn fail(&mut self, err: PacketError) {
        debug!(error = %err, state = ?self.state, "discarding packet");
        self.status = err.status();
        self.last_error = Some(err);
        self.reset();
    }
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;

    use super::*;
    use crate::clock::ManualClock;
    use crate::codec::encode_frame;
    use crate::config::PacketConfig;
    use crate::freshness::FreshnessPolicy;

    fn engine(config: PacketConfig) -> (Packet<ManualClock>, ManualClock) {
        let clock = ManualClock::new(1_000);
        (Packet::with_clock(config, clock.clone()), clock)
    }

    fn frame(payload: &[u8], command: u16, id: u8, packed: bool) -> Vec<u8> {
        let mut wire = BytesMut::new();
        encode_frame(payload, command, id, packed, &mut wire);
        wire.to_vec()
    }

    fn feed(packet: &mut Packet<ManualClock>, bytes: &[u8]) -> Vec<u16> {
        bytes.iter().map(|&b| packet.parse(b, true)).collect()
    }

    #[test]
    fn walks_every_state() {
        let (mut packet, _clock) = engine(PacketConfig::default());
        let wire = frame(&[0xAB, 0xCD], 3, 4, false);

        let expected = [
            ParserState::IdByte,
            ParserState::CommandHi,
            ParserState::CommandLo,
            ParserState::Overhead,
            ParserState::LenHi,
            ParserState::LenLo,
            ParserState::Payload,
            ParserState::Payload,
            ParserState::CrcHi,
            ParserState::CrcLo,
            ParserState::EndByte,
            ParserState::StartByte,
        ];
        for (byte, state) in wire.iter().zip(expected) {
            packet.parse(*byte, true);
            assert_eq!(packet.state(), state);
        }
        assert_eq!(packet.status(), Status::NewData);
        assert_eq!(packet.received(), &[0xAB, 0xCD]);
        assert_eq!(packet.current_command(), 3);
        assert_eq!(packet.current_packet_id(), 4);
    }

    #[test]
    fn only_the_stop_byte_returns_length() {
        let (mut packet, _clock) = engine(PacketConfig::default());
        let wire = frame(b"hello", 1, 0, false);
        let results = feed(&mut packet, &wire);

        let (last, rest) = results.split_last().unwrap();
        assert_eq!(*last, 5);
        assert!(rest.iter().all(|&n| n == 0));
    }

    #[test]
    fn noise_before_start_is_ignored() {
        let (mut packet, _clock) = engine(PacketConfig::default());
        feed(&mut packet, &[0x00, 0x81, 0xFF]);
        assert_eq!(packet.state(), ParserState::StartByte);
        assert_eq!(packet.status(), Status::Continue);

        let results = feed(&mut packet, &frame(b"x", 1, 0, false));
        assert_eq!(results.last(), Some(&1));
    }

    #[test]
    fn no_data_preserves_partial_packet() {
        let (mut packet, _clock) = engine(PacketConfig::default());
        let wire = frame(b"abcdef", 2, 1, false);

        feed(&mut packet, &wire[..9]);
        let state = packet.state();
        assert_eq!(packet.parse(0, false), 0);
        assert_eq!(packet.status(), Status::NoData);
        assert_eq!(packet.state(), state);

        let results = feed(&mut packet, &wire[9..]);
        assert_eq!(results.last(), Some(&6));
        assert_eq!(packet.received(), b"abcdef");
    }

    #[test]
    fn zero_command_is_payload_error() {
        let (mut packet, _clock) = engine(PacketConfig::default());
        feed(&mut packet, &[START_BYTE, 0, 0x00, 0x00]);
        assert_eq!(packet.status(), Status::PayloadError);
        assert_eq!(packet.last_error(), Some(&PacketError::InvalidCommand(0)));
        assert_eq!(packet.state(), ParserState::StartByte);
    }

    #[test]
    fn command_above_max_payload_is_payload_error() {
        let (mut packet, _clock) = engine(PacketConfig::default());
        feed(&mut packet, &[START_BYTE, 0, 0x03, 0xF7]);
        assert_eq!(packet.status(), Status::PayloadError);
        assert_eq!(
            packet.last_error(),
            Some(&PacketError::InvalidCommand(1015))
        );

        let (mut packet, _clock) = engine(PacketConfig::default());
        feed(&mut packet, &[START_BYTE, 0, 0x03, 0xF6]);
        assert_eq!(packet.status(), Status::Continue);
        assert_eq!(packet.state(), ParserState::Overhead);
    }

    #[test]
    fn length_out_of_range_is_payload_error() {
        for len in [0u16, 1015, 0xFFFF] {
            let (mut packet, _clock) = engine(PacketConfig::default());
            let [hi, lo] = len.to_be_bytes();
            feed(&mut packet, &[START_BYTE, 0, 0, 1, 0xFF, hi, lo]);
            assert_eq!(packet.status(), Status::PayloadError, "len {len}");
            assert_eq!(
                packet.last_error(),
                Some(&PacketError::InvalidPayloadLength(len))
            );
            assert_eq!(packet.state(), ParserState::StartByte);
        }
    }

    #[test]
    fn corrupted_checksum_is_checksum_error() {
        let (mut packet, _clock) = engine(PacketConfig::default());
        let mut wire = frame(b"payload", 1, 0, false);
        let crc_index = wire.len() - 3;
        wire[crc_index] ^= 0x01;

        let results = feed(&mut packet, &wire[..wire.len() - 1]);
        assert!(results.iter().all(|&n| n == 0));
        assert_eq!(packet.status(), Status::ChecksumError);
        assert!(packet.rx_buff().as_slice().iter().all(|&b| b == 0));
        assert_eq!(packet.state(), ParserState::StartByte);
    }

    #[test]
    fn wrong_stop_byte_is_stop_byte_error() {
        let (mut packet, _clock) = engine(PacketConfig::default());
        let mut wire = frame(b"payload", 1, 0, false);
        let last = wire.len() - 1;
        wire[last] = 0x00;

        feed(&mut packet, &wire);
        assert_eq!(packet.status(), Status::StopByteError);
        assert_eq!(packet.last_error(), Some(&PacketError::StopByte(0x00)));
        assert!(packet.rx_buff().as_slice().iter().all(|&b| b == 0));
    }

    #[test]
    fn packed_payload_is_restored() {
        let config = PacketConfig {
            packed: true,
            ..PacketConfig::default()
        };
        let (mut packet, _clock) = engine(config);
        let wire = frame(&[START_BYTE, 0x01, 0x02], 1, 0, true);
        assert_eq!(wire[4], 0);
        assert!(!wire[7..10].contains(&START_BYTE));

        let results = feed(&mut packet, &wire);
        assert_eq!(results.last(), Some(&3));
        assert_eq!(packet.received(), &[START_BYTE, 0x01, 0x02]);
    }

    #[test]
    fn stale_under_max_message_time() {
        let config = PacketConfig {
            freshness: FreshnessPolicy::MaxMessageTime,
            ..PacketConfig::default()
        };
        let (mut packet, clock) = engine(config);
        let wire = frame(b"slow", 1, 0, false);

        feed(&mut packet, &wire[..3]);
        clock.advance(30);
        feed(&mut packet, &wire[3..6]);
        assert_eq!(packet.status(), Status::Continue);

        // 30 + 25 ms since the start byte exceeds 50 ms even though the gap
        // between bytes is small.
        clock.advance(25);
        let state = packet.state();
        assert_ne!(state, ParserState::StartByte);
        assert_eq!(packet.parse(wire[6], true), 0);
        assert_eq!(packet.status(), Status::StalePacketError);
        assert_eq!(packet.state(), ParserState::StartByte);
        assert!(matches!(
            packet.last_error(),
            Some(PacketError::StalePacket {
                elapsed_ms: 55,
                timeout_ms: 50
            })
        ));
    }

    #[test]
    fn min_inter_byte_delta_tolerates_slow_but_steady_input() {
        let (mut packet, clock) = engine(PacketConfig::default());
        let wire = frame(b"steady", 1, 0, false);

        let mut results = Vec::new();
        for &byte in &wire {
            clock.advance(40);
            results.push(packet.parse(byte, true));
            assert!(!packet.status().is_error());
        }
        assert_eq!(results.last(), Some(&6));
    }

    #[test]
    fn min_inter_byte_delta_detects_gap() {
        let (mut packet, clock) = engine(PacketConfig::default());
        let wire = frame(b"gap", 1, 0, false);

        feed(&mut packet, &wire[..4]);
        clock.advance(50);
        assert_eq!(packet.parse(wire[4], true), 0);
        assert_eq!(packet.status(), Status::StalePacketError);
    }

    #[test]
    fn staleness_boundary_matches_policy() {
        for policy in [FreshnessPolicy::MaxMessageTime, FreshnessPolicy::MinInterByteDelta] {
            let config = PacketConfig {
                freshness: policy,
                ..PacketConfig::default()
            };
            let (mut packet, clock) = engine(config.clone());
            let wire = frame(b"edge", 1, 0, false);

            packet.parse(wire[0], true);
            clock.advance(49);
            packet.parse(wire[1], true);
            assert_eq!(packet.status(), Status::Continue, "{policy:?} at 49 ms");
            assert!(policy.is_fresh(Some(1_000), 1_000, 1_049, 50));

            let (mut packet, clock) = engine(config);
            packet.parse(wire[0], true);
            clock.advance(50);
            packet.parse(wire[1], true);
            assert_eq!(packet.status(), Status::StalePacketError, "{policy:?} at 50 ms");
            assert!(!policy.is_fresh(Some(1_000), 1_000, 1_050, 50));
        }
    }

    #[test]
    fn stale_byte_is_not_consumed_as_start() {
        let config = PacketConfig {
            freshness: FreshnessPolicy::MaxMessageTime,
            ..PacketConfig::default()
        };
        let (mut packet, clock) = engine(config);

        feed(&mut packet, &[START_BYTE, 0]);
        clock.advance(100);
        packet.parse(START_BYTE, true);
        assert_eq!(packet.status(), Status::StalePacketError);
        assert_eq!(packet.state(), ParserState::StartByte);

        // The next start byte begins a fresh packet.
        packet.parse(START_BYTE, true);
        assert_eq!(packet.state(), ParserState::IdByte);
    }

    #[test]
    fn idle_engine_never_goes_stale() {
        let (mut packet, clock) = engine(PacketConfig::default());
        clock.advance(1_000_000);
        packet.parse(0x00, true);
        assert_eq!(packet.status(), Status::Continue);
    }

    #[test]
    fn recovers_after_error() {
        let (mut packet, _clock) = engine(PacketConfig::default());
        let mut bad = frame(b"bad", 1, 0, false);
        let last = bad.len() - 1;
        bad[last] = 0x00;

        feed(&mut packet, &bad);
        assert_eq!(packet.status(), Status::StopByteError);

        let results = feed(&mut packet, &frame(b"good", 2, 0, false));
        assert_eq!(results.last(), Some(&4));
        assert_eq!(packet.received(), b"good");
        assert_eq!(packet.last_error(), None);
    }
}
