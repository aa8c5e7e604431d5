use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use serialpkt_packet::{ReceivedPacket, SerialTransfer};
use serialpkt_transport::serial;
use tracing::{debug, info};

use crate::cmd::{parse_duration, ListenArgs};
use crate::exit::{link_error, transport_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_packet, OutputFormat, PacketRecord};

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let config = args.engine.config()?;
    let poll_interval = parse_duration(&args.poll_interval)?;

    let device =
        serial::open(&args.device, args.baud).map_err(|err| transport_error("open failed", err))?;
    let mut link = SerialTransfer::with_config(device, config);
    info!(device = %args.device.display(), "listening");

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut printed = 0usize;

    while running.load(Ordering::SeqCst) {
        let len = link
            .available()
            .map_err(|err| link_error("receive failed", err))?;

        if len == 0 {
            thread::sleep(poll_interval);
            continue;
        }

        let packet = ReceivedPacket {
            id: link.current_packet_id(),
            command: link.current_command(),
            payload: link.received(),
        };
        if let Some(ids) = &args.ids {
            if !ids.contains(&packet.id) {
                continue;
            }
        }

        print_packet(&PacketRecord::from(&packet), format);
        printed = printed.saturating_add(1);

        if let Some(count) = args.count {
            if printed >= count {
                break;
            }
        }
    }

    debug!(printed, "stopped listening");
    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
