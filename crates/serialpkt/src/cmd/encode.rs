use std::fs;

use bytes::BytesMut;
use serialpkt_packet::Packet;
use tracing::debug;

use crate::cmd::EncodeArgs;
use crate::exit::{io_error, CliResult, SUCCESS};
use crate::output::{print_encoded, EncodedFrame, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let payload = args.payload.resolve()?;
    let config = args.engine.config()?;
    let packed = config.packed;

    let mut packet = Packet::with_config(config);
    packet.tx_bytes(&payload, 0);
    let len = packet.construct_packet(payload.len() as u16, args.header.command, args.header.id);

    let mut frame = BytesMut::new();
    packet.encode_into(len, &mut frame);
    debug!(len, frame_len = frame.len(), "encoded frame");

    if let Some(path) = &args.output {
        fs::write(path, &frame)
            .map_err(|err| io_error(&format!("failed writing {}", path.display()), err))?;
        return Ok(SUCCESS);
    }

    print_encoded(
        &EncodedFrame {
            packet_id: args.header.id,
            command: args.header.command,
            packed,
            overhead: packet.overhead_byte(),
            payload_len: usize::from(len),
            frame: &frame,
        },
        format,
    );
    Ok(SUCCESS)
}
