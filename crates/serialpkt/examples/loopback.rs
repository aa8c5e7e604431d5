//! Loopback demo: two engines joined by an in-memory link.
//!
//! Run with:
//!   cargo run --example loopback
//!
//! The sender pushes a few packets (one full of delimiter bytes) through a
//! packed link; the receiver routes them to callbacks by packet ID.

use serialpkt::packet::{CallbackTable, PacketConfig, ReceivedPacket, SerialTransfer};
use serialpkt::transport::MemoryTransport;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = PacketConfig {
        packed: true,
        ..PacketConfig::default()
    };

    let (left, right) = MemoryTransport::pair();
    let mut sender = SerialTransfer::with_config(left, config.clone());

    let callbacks = CallbackTable::new()
        .with(|p: &ReceivedPacket<'_>| {
            eprintln!("telemetry: command={} payload={:?}", p.command, p.payload);
        })
        .with(|p: &ReceivedPacket<'_>| {
            eprintln!(
                "text: {}",
                String::from_utf8_lossy(p.payload)
            );
        });
    let mut receiver = SerialTransfer::with_config(right, config).with_callbacks(callbacks);

    sender.packet_mut().tx_obj(&1234u16, 0);
    sender.packet_mut().tx_obj(&-3.5f32, 2);
    sender.send_data(6, 1, 0)?;
    sender.send_payload(b"hello over serial", 2, 1)?;
    sender.send_payload(&[0x7E, 0x81, 0x7E, 0x7E], 3, 0)?;

    let mut received = 0;
    while receiver.available()? > 0 {
        received += 1;
    }
    eprintln!("received {received} packets");

    Ok(())
}
