use std::fs;
use std::io::Read;
use std::sync::{Arc, Mutex, PoisonError};

use serialpkt_packet::{CallbackTable, Packet, PacketConfig, ReceivedPacket};
use tracing::warn;

use crate::cmd::DecodeArgs;
use crate::exit::{io_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{from_hex, print_packets, ErrorRecord, OutputFormat, PacketRecord};

#[derive(Debug, Default)]
pub struct Decoded {
    pub packets: Vec<PacketRecord>,
    pub errors: Vec<ErrorRecord>,
}

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let raw = read_input(&args)?;
    let bytes = if args.hex_input {
        let text = String::from_utf8(raw)
            .map_err(|err| CliError::usage(format!("hex input is not UTF-8: {err}")))?;
        from_hex(&text).map_err(|err| CliError::usage(format!("hex input: {err}")))?
    } else {
        raw
    };

    // A file has no timing, so partial packets never go stale.
    let config = PacketConfig {
        packed: args.packed,
        ..PacketConfig::without_timeout()
    };

    let decoded = decode_stream(&bytes, config);
    for error in &decoded.errors {
        warn!(offset = error.offset, status = %error.status, "{}", error.error);
    }
    print_packets(&decoded.packets, format);

    if decoded.packets.is_empty() && !decoded.errors.is_empty() {
        return Err(CliError::new(
            DATA_INVALID,
            format!("no valid packets ({} discarded)", decoded.errors.len()),
        ));
    }
    Ok(SUCCESS)
}

/// Run `bytes` through a fresh engine, collecting packets via a catch-all
/// callback for every packet ID.
pub fn decode_stream(bytes: &[u8], config: PacketConfig) -> Decoded {
    let packets = Arc::new(Mutex::new(Vec::new()));
    let mut table = CallbackTable::new();
    for id in 0..=u8::MAX {
        let sink = Arc::clone(&packets);
        table.set(id, move |packet: &ReceivedPacket<'_>| {
            sink.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(PacketRecord::from(packet));
        });
    }

    let mut packet = Packet::with_config(config).with_callbacks(table);
    let mut errors = Vec::new();
    for (offset, &byte) in bytes.iter().enumerate() {
        packet.parse(byte, true);
        if packet.status().is_error() {
            if let Some(err) = packet.last_error() {
                errors.push(ErrorRecord::new(offset, err));
            }
        }
    }

    drop(packet);
    let packets = std::mem::take(&mut *packets.lock().unwrap_or_else(PoisonError::into_inner));

    Decoded { packets, errors }
}

fn read_input(args: &DecodeArgs) -> CliResult<Vec<u8>> {
    match &args.input {
        Some(path) if path.as_os_str() != "-" => fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err)),
        _ => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .map_err(|err| io_error("failed reading stdin", err))?;
            Ok(buf)
        }
    }
}
