use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use serialpkt_packet::{PacketError, ReceivedPacket, Status};

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// A received packet detached from the engine's buffers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PacketRecord {
    pub packet_id: u8,
    pub command: u16,
    pub len: usize,
    #[serde(serialize_with = "serialize_hex")]
    pub payload: Vec<u8>,
}

impl From<&ReceivedPacket<'_>> for PacketRecord {
    fn from(packet: &ReceivedPacket<'_>) -> Self {
        Self {
            packet_id: packet.id,
            command: packet.command,
            len: packet.payload.len(),
            payload: packet.payload.to_vec(),
        }
    }
}

/// A discarded packet, reported by `decode`.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    pub offset: usize,
    pub status: Status,
    pub error: String,
}

impl ErrorRecord {
    pub fn new(offset: usize, error: &PacketError) -> Self {
        Self {
            offset,
            status: error.status(),
            error: error.to_string(),
        }
    }
}

#[derive(Serialize)]
struct EncodedOutput<'a> {
    packet_id: u8,
    command: u16,
    packed: bool,
    overhead: u8,
    payload_len: usize,
    frame_len: usize,
    frame: &'a str,
}

pub struct EncodedFrame<'a> {
    pub packet_id: u8,
    pub command: u16,
    pub packed: bool,
    pub overhead: u8,
    pub payload_len: usize,
    pub frame: &'a [u8],
}

pub fn print_packet(packet: &PacketRecord, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(packet),
        OutputFormat::Table => print_packets_table(std::slice::from_ref(packet)),
        OutputFormat::Pretty => {
            println!(
                "id={} command={} len={} payload={}",
                packet.packet_id,
                packet.command,
                packet.len,
                payload_preview(&packet.payload)
            );
        }
        OutputFormat::Raw => print_raw(&packet.payload),
    }
}

pub fn print_packets(packets: &[PacketRecord], format: OutputFormat) {
    match format {
        OutputFormat::Table if !packets.is_empty() => print_packets_table(packets),
        OutputFormat::Table => {}
        _ => packets.iter().for_each(|p| print_packet(p, format)),
    }
}

fn print_packets_table(packets: &[PacketRecord]) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["ID", "COMMAND", "LEN", "PAYLOAD"]);
    for packet in packets {
        table.add_row(vec![
            packet.packet_id.to_string(),
            packet.command.to_string(),
            packet.len.to_string(),
            payload_preview(&packet.payload),
        ]);
    }
    println!("{table}");
}

pub fn print_encoded(encoded: &EncodedFrame<'_>, format: OutputFormat) {
    let frame_hex = hex::encode(encoded.frame);
    match format {
        OutputFormat::Json => print_json(&EncodedOutput {
            packet_id: encoded.packet_id,
            command: encoded.command,
            packed: encoded.packed,
            overhead: encoded.overhead,
            payload_len: encoded.payload_len,
            frame_len: encoded.frame.len(),
            frame: &frame_hex,
        }),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["ID", "COMMAND", "OVERHEAD", "LEN", "FRAME"])
                .add_row(vec![
                    encoded.packet_id.to_string(),
                    encoded.command.to_string(),
                    format!("0x{:02x}", encoded.overhead),
                    encoded.payload_len.to_string(),
                    frame_hex,
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!("{frame_hex}"),
        OutputFormat::Raw => print_raw(encoded.frame),
    }
}

pub fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

/// Parse hex text, ignoring whitespace and an optional `0x` prefix.
pub fn from_hex(text: &str) -> Result<Vec<u8>, String> {
    let trimmed = text.trim();
    let digits: String = trimmed
        .strip_prefix("0x")
        .unwrap_or(trimmed)
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    hex::decode(&digits).map_err(|err| format!("invalid hex input: {err}"))
}

fn serialize_hex<S: serde::Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex::encode(bytes))
}

fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) if !text.chars().any(char::is_control) => text.to_string(),
        _ => format!("0x{}", hex::encode(payload)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_input_tolerates_spacing_and_prefix() {
        assert_eq!(from_hex("7e 00 FF").unwrap(), vec![0x7e, 0x00, 0xff]);
        assert_eq!(from_hex("0x0102").unwrap(), vec![1, 2]);
    }

    #[test]
    fn hex_rejects_garbage() {
        assert!(from_hex("abc").unwrap_err().to_lowercase().contains("odd"));
        assert!(from_hex("zz").is_err());
        assert!(from_hex("0x0g").is_err());
    }

    #[test]
    fn preview_falls_back_to_hex() {
        assert_eq!(payload_preview(b"hello"), "hello");
        assert_eq!(payload_preview(&[0x7e, 0x01]), "0x7e01");
    }

    #[test]
    fn packet_record_serializes_payload_as_hex() {
        let record = PacketRecord::from(&ReceivedPacket {
            id: 2,
            command: 5,
            payload: b"ok",
        });
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(
            json,
            r#"{"packet_id":2,"command":5,"len":2,"payload":"6f6b"}"#
        );
    }
}
