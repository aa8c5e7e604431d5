use std::sync::{Arc, Mutex};

use bytes::BytesMut;
use serialpkt_packet::{
    crc16, encode_frame, CallbackTable, FreshnessPolicy, ManualClock, Packet, PacketConfig,
    ReceivedPacket, Status, MAX_PAYLOAD, START_BYTE,
};

fn engine(packed: bool) -> Packet<ManualClock> {
    let config = PacketConfig {
        packed,
        ..PacketConfig::default()
    };
    Packet::with_clock(config, ManualClock::new(0))
}

/// Payload that exercises every byte value, delimiters included.
fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 + 3) as u8).collect()
}

fn transmit(tx: &mut Packet<ManualClock>, payload: &[u8], command: u16, id: u8) -> Vec<u8> {
    tx.tx_bytes(payload, 0);
    let len = tx.construct_packet(payload.len() as u16, command, id);
    let mut wire = BytesMut::new();
    tx.encode_into(len, &mut wire);
    wire.to_vec()
}

fn receive(rx: &mut Packet<ManualClock>, wire: &[u8]) -> u16 {
    let mut completed = 0;
    for &byte in wire {
        completed = rx.parse(byte, true);
    }
    completed
}

#[test]
fn every_payload_length_roundtrips_unpacked() {
    let mut tx = engine(false);
    let mut rx = engine(false);

    for len in 1..=MAX_PAYLOAD {
        let payload = pattern(len);
        let wire = transmit(&mut tx, &payload, 1, 2);
        assert_eq!(receive(&mut rx, &wire), len as u16, "len {len}");
        assert_eq!(rx.status(), Status::NewData);
        assert_eq!(rx.received(), payload.as_slice(), "len {len}");
    }
}

#[test]
fn every_payload_length_roundtrips_packed() {
    let mut tx = engine(true);
    let mut rx = engine(true);

    for len in 1..=MAX_PAYLOAD {
        let payload = pattern(len);
        let wire = transmit(&mut tx, &payload, 3, 4);
        assert_eq!(receive(&mut rx, &wire), len as u16, "len {len}");
        assert_eq!(rx.received(), payload.as_slice(), "len {len}");
        assert_eq!(rx.current_command(), 3);
        assert_eq!(rx.current_packet_id(), 4);
    }
}

#[test]
fn packed_frame_hides_early_delimiters() {
    let mut tx = engine(true);
    let wire = transmit(&mut tx, &[START_BYTE, 0x01, 0x02], 1, 0);

    assert_eq!(tx.overhead_byte(), 0);
    assert_eq!(&wire[7..10], &[0x00, 0x01, 0x02]);

    let mut rx = engine(true);
    assert_eq!(receive(&mut rx, &wire), 3);
    assert_eq!(rx.received(), &[START_BYTE, 0x01, 0x02]);
}

#[test]
fn frame_layout_matches_wire_format() {
    let mut wire = BytesMut::new();
    let written = encode_frame(b"AB", 0x0102, 0x33, false, &mut wire);
    let crc = crc16(b"AB").to_be_bytes();

    assert_eq!(written, 12);
    assert_eq!(
        wire.as_ref(),
        &[0x7E, 0x33, 0x01, 0x02, 0x00, 0x00, 0x02, b'A', b'B', crc[0], crc[1], 0x81]
    );
}

#[test]
fn any_single_bit_flip_is_rejected() {
    let payload = pattern(16);
    let mut clean = BytesMut::new();
    encode_frame(&payload, 1, 0, false, &mut clean);

    // Flip every bit of the payload and checksum fields.
    for index in 7..clean.len() - 1 {
        for bit in 0..8 {
            let mut wire = clean.to_vec();
            wire[index] ^= 1 << bit;

            let mut rx = engine(false);
            assert_eq!(receive(&mut rx, &wire), 0, "byte {index} bit {bit}");
            assert_eq!(rx.status(), Status::ChecksumError, "byte {index} bit {bit}");
            assert!(rx.rx_buff().as_slice().iter().all(|&b| b == 0));
        }
    }
}

#[test]
fn back_to_back_frames_in_one_stream() {
    let mut stream = BytesMut::new();
    for (i, word) in ["alpha", "beta", "gamma"].iter().enumerate() {
        encode_frame(word.as_bytes(), i as u16 + 1, i as u8, true, &mut stream);
    }

    let mut rx = engine(true);
    let mut seen = Vec::new();
    for &byte in stream.iter() {
        if rx.parse(byte, true) > 0 {
            seen.push(String::from_utf8(rx.received().to_vec()).unwrap());
        }
    }
    assert_eq!(seen, ["alpha", "beta", "gamma"]);
}

#[test]
fn callback_table_routes_by_packet_id() {
    let hits = Arc::new(Mutex::new(Vec::new()));
    let mut table = CallbackTable::new();
    for slot in 0..3u8 {
        let hits = Arc::clone(&hits);
        table.push(move |p: &ReceivedPacket<'_>| {
            hits.lock().unwrap().push((slot, p.id, p.payload.to_vec()));
        });
    }

    let mut rx = engine(false).with_callbacks(table);
    let mut wire = BytesMut::new();
    encode_frame(b"one", 1, 1, false, &mut wire);
    encode_frame(b"five", 1, 5, false, &mut wire);
    receive(&mut rx, &wire);

    assert_eq!(*hits.lock().unwrap(), vec![(1u8, 1u8, b"one".to_vec())]);
    // The packet without a handler is still delivered to the caller.
    assert_eq!(rx.status(), Status::NewData);
    assert_eq!(rx.received(), b"five");
}

#[test]
fn slow_sender_passes_only_under_inter_byte_policy() {
    let mut wire = BytesMut::new();
    encode_frame(b"drip", 1, 0, false, &mut wire);

    for (policy, expected) in [
        (FreshnessPolicy::MinInterByteDelta, Status::NewData),
        (FreshnessPolicy::MaxMessageTime, Status::StalePacketError),
    ] {
        let clock = ManualClock::new(10);
        let config = PacketConfig {
            freshness: policy,
            ..PacketConfig::default()
        };
        let mut rx = Packet::with_clock(config, clock.clone());

        let mut last = Status::Continue;
        for &byte in wire.iter() {
            clock.advance(10);
            rx.parse(byte, true);
            last = rx.status();
            if last.is_error() {
                break;
            }
        }
        assert_eq!(last, expected, "{policy:?}");
    }
}
