use serialpkt_packet::SerialTransfer;
use serialpkt_transport::serial;
use tracing::info;

use crate::cmd::SendArgs;
use crate::exit::{link_error, transport_error, CliResult, SUCCESS};
use crate::output::{print_json, OutputFormat};

#[derive(serde::Serialize)]
struct SendOutput<'a> {
    device: &'a str,
    packet_id: u8,
    command: u16,
    bytes_sent: u16,
}

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let payload = args.payload.resolve()?;
    let config = args.engine.config()?;

    let device =
        serial::open(&args.device, args.baud).map_err(|err| transport_error("open failed", err))?;
    let mut link = SerialTransfer::with_config(device, config);

    let sent = link
        .send_payload(&payload, args.header.command, args.header.id)
        .map_err(|err| link_error("send failed", err))?;
    info!(device = %args.device.display(), sent, "packet sent");

    match format {
        OutputFormat::Json => print_json(&SendOutput {
            device: &args.device.to_string_lossy(),
            packet_id: args.header.id,
            command: args.header.command,
            bytes_sent: sent,
        }),
        OutputFormat::Table | OutputFormat::Pretty => println!(
            "sent {sent} bytes to {} (id={} command={})",
            args.device.display(),
            args.header.id,
            args.header.command
        ),
        OutputFormat::Raw => {}
    }
    Ok(SUCCESS)
}
